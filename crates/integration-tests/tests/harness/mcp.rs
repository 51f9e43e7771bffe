//! Minimal JSON-RPC client for the streamable HTTP MCP endpoint

use std::time::Duration;

use serde_json::{Value, json};

use super::server::TestServer;

/// `initialize` params of a client with no capabilities
pub fn initialize_params() -> Value {
    json!({
        "protocolVersion": "2025-03-26",
        "capabilities": {},
        "clientInfo": {"name": "integration-tests", "version": "0.0.0"}
    })
}

/// Send one request to `/mcp` and return the JSON-RPC message answering it
///
/// The stateless transport replies with an SSE stream; the first `data:`
/// event carrying an `id` is the response.
pub async fn rpc(server: &TestServer, method: &str, params: Value) -> Value {
    let body = json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params});

    let mut resp = server
        .client()
        .post(server.url("/mcp"))
        .header("accept", "application/json, text/event-stream")
        .json(&body)
        .send()
        .await
        .expect("request must reach the test server");

    assert!(resp.status().is_success(), "MCP status {}", resp.status());

    tokio::time::timeout(Duration::from_secs(10), async move {
        let mut buffer = String::new();

        while let Some(chunk) = resp.chunk().await.expect("MCP stream must be readable") {
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            let message = buffer
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .filter_map(|data| serde_json::from_str::<Value>(data.trim()).ok())
                .find(|message| message.get("id").is_some());

            if let Some(message) = message {
                return message;
            }
        }

        panic!("MCP stream ended without a response: {buffer}");
    })
    .await
    .expect("MCP response must arrive in time")
}
