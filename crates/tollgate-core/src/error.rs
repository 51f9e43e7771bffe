use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Trait for domain errors that can be converted to HTTP responses
///
/// The route boundary uses this to build the JSON error body, keeping
/// status mapping next to the error definition.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `validation_error`)
    fn error_type(&self) -> &str;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String;
}

/// Errors produced by service clients and the request boundary
///
/// Upstream failures always land in exactly one of `Config`, `Api` or
/// `Client`. `Validation` is raised before any upstream call is made.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Request input failed a field constraint
    #[error("invalid field `{field}`: {message}")]
    Validation { field: String, message: String },

    /// The service is misconfigured (missing key, bad base URL)
    #[error("configuration error: {0}")]
    Config(String),

    /// The upstream API reported a failure or returned an unreadable body
    #[error("upstream API error: {message}")]
    Api {
        status: Option<u16>,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Unexpected local fault (connection failure, timeout, encoding bug)
    #[error("client error: {0}")]
    Client(String),

    /// No tool with this name is registered
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

impl ServiceError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn api(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            details: None,
        }
    }

    /// Build an `Api` error from a non-success upstream response body
    ///
    /// JSON bodies are kept as details and mined for a human-readable
    /// message; anything else is used verbatim.
    pub fn from_upstream(status: u16, body: &str) -> Self {
        let details = serde_json::from_str::<serde_json::Value>(body).ok();
        let message = details
            .as_ref()
            .and_then(upstream_message)
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("upstream returned status {status}")
                } else {
                    body.trim().to_string()
                }
            });

        Self::Api {
            status: Some(status),
            message,
            details,
        }
    }

    /// Whether retrying the same request may succeed
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Client(_) => true,
            Self::Api { status: Some(status), .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Pull a message out of the common upstream error body shapes
fn upstream_message(value: &serde_json::Value) -> Option<String> {
    for key in ["message", "detail", "error", "status"] {
        match value.get(key) {
            Some(serde_json::Value::String(s)) => return Some(s.clone()),
            Some(nested @ serde_json::Value::Object(_)) => {
                if let Some(message) = upstream_message(nested) {
                    return Some(message);
                }
            }
            _ => {}
        }
    }
    None
}

impl HttpError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UnknownTool(_) => StatusCode::NOT_FOUND,
            Self::Api { status, .. } => match status {
                Some(400) => StatusCode::BAD_REQUEST,
                Some(401) => StatusCode::UNAUTHORIZED,
                Some(403) => StatusCode::FORBIDDEN,
                Some(404) => StatusCode::NOT_FOUND,
                Some(429) => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Config(_) | Self::Client(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::Config(_) => "configuration_error",
            Self::Api { .. } => "api_error",
            Self::Client(_) => "internal_error",
            Self::UnknownTool(_) => "not_found_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Client(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Error body shared by every REST endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub message: String,
    pub r#type: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Build a JSON error response with the shared body shape
pub fn error_response(status: StatusCode, error_type: &str, message: String, field: Option<String>) -> Response {
    let body = ErrorResponse {
        error: ErrorDetails {
            message,
            r#type: error_type.to_string(),
            code: status.as_u16(),
            field,
        },
    };

    (status, Json(body)).into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        tracing::error!(error = ?self, status = status.as_u16(), "request failed");

        let field = match &self {
            Self::Validation { field, .. } => Some(field.clone()),
            _ => None,
        };

        error_response(status, self.error_type(), self.client_message(), field)
    }
}
