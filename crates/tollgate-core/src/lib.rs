//! Shared building blocks for Tollgate services
//!
//! Error taxonomy, request validation, the validated JSON extractor and the
//! tool abstraction that backs both the REST and MCP surfaces.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod error;
mod extract;
mod http_client;
mod retry;
mod tool;
pub mod validate;

pub use error::{ErrorDetails, ErrorResponse, HttpError, Result, ServiceError, error_response};
pub use extract::{BODY_LIMIT_BYTES, ValidatedJson};
pub use http_client::{check_status, http_client, json_body, send_error};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use tool::{RegisteredTool, ToolRegistry, ToolService, ToolSpec, qualified_name, to_value};
pub use validate::Validate;
