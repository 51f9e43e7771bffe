use std::{sync::OnceLock, time::Duration};

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::error::{Result, ServiceError};

/// Common HTTP client to reuse connections across service clients
///
/// Per-call timeouts are set on each request from the service config.
pub fn http_client() -> Client {
    static CLIENT: OnceLock<Client> = OnceLock::new();

    CLIENT
        .get_or_init(|| {
            let mut headers = http::HeaderMap::new();
            headers.insert(http::header::CONNECTION, http::HeaderValue::from_static("keep-alive"));

            Client::builder()
                .timeout(Duration::from_secs(120))
                .pool_idle_timeout(Some(Duration::from_secs(5)))
                .tcp_nodelay(true)
                .tcp_keepalive(Some(Duration::from_secs(60)))
                .user_agent(concat!("tollgate/", env!("CARGO_PKG_VERSION")))
                .default_headers(headers)
                .build()
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "failed to build tuned HTTP client, using defaults");
                    Client::new()
                })
        })
        .clone()
}

/// Map a transport failure to a client error
pub fn send_error(service: &str, error: &reqwest::Error) -> ServiceError {
    tracing::error!(service, error = %error, "upstream request failed");

    if error.is_timeout() {
        ServiceError::Client(format!("request to {service} timed out"))
    } else if error.is_connect() {
        ServiceError::Client(format!("failed to connect to {service}: {error}"))
    } else {
        ServiceError::Client(format!("failed to send request to {service}: {error}"))
    }
}

/// Return the response if it succeeded, otherwise an `Api` error with the body
pub async fn check_status(service: &str, response: Response) -> Result<Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::error!(service, status = %status, "upstream API error");

    Err(ServiceError::from_upstream(status.as_u16(), &body))
}

/// Check the status and decode a JSON body
///
/// A body that does not match the expected shape is an upstream fault and
/// reported as an `Api` error.
pub async fn json_body<T: DeserializeOwned>(service: &str, response: Response) -> Result<T> {
    let response = check_status(service, response).await?;
    let status = response.status().as_u16();

    let bytes = response
        .bytes()
        .await
        .map_err(|e| {
            let e = e.without_url();
            tracing::error!(service, error = %e, "failed to read upstream response body");
            ServiceError::Client(format!("failed to read {service} response body: {e}"))
        })?;

    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::error!(service, error = %e, "failed to decode upstream response");
        ServiceError::api(Some(status), format!("unexpected response from {service}: {e}"))
    })
}
