#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod server;

use std::{sync::Arc, time::Duration};

use axum::{Router, routing};
use rmcp::transport::{
    StreamableHttpServerConfig, StreamableHttpService, streamable_http_server::session::never::NeverSessionManager,
};
use tollgate_config::McpConfig;
use tollgate_core::ToolRegistry;
use tollgate_x402::PaymentGate;

pub use server::McpServer;

/// Build the MCP router serving every registered tool
///
/// Uses the streamable HTTP transport without sessions, so each request is
/// handled by a fresh handler over the shared registry. Tool calls are
/// charged through `payment` when the tool's REST path is priced.
pub fn mcp_router(config: &McpConfig, registry: ToolRegistry, payment: Option<Arc<PaymentGate>>) -> Router {
    tracing::info!(path = %config.path, tools = registry.tools().len(), "MCP endpoint enabled");

    let mcp_server = McpServer::new(registry, config.instructions.clone()).with_payment(payment);

    let service = StreamableHttpService::new(
        move || Ok(mcp_server.clone()),
        Arc::new(NeverSessionManager::default()),
        StreamableHttpServerConfig {
            sse_keep_alive: Some(Duration::from_secs(config.sse_keep_alive_secs)),
            stateful_mode: false,
        },
    );

    Router::new().route(
        &config.path,
        routing::get_service(service.clone())
            .post_service(service.clone())
            .delete_service(service),
    )
}
