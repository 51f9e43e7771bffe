use axum::{body::Body, response::Response};
use http::StatusCode;
use serde::de::DeserializeOwned;

use crate::{
    error::error_response,
    validate::{Validate, deserialize_error},
};

/// Body limit for JSON requests (1 MiB)
pub const BODY_LIMIT_BYTES: usize = 1 << 20;

/// Extractor for validated JSON request bodies
///
/// Rejects non-JSON content types (415), oversized bodies (413) and
/// unparseable JSON (400). Bodies that parse but break the schema or a
/// field constraint are rejected with 422.
pub struct ValidatedJson<T>(pub T);

impl<S, T> axum::extract::FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = Response;

    async fn from_request(request: http::Request<Body>, _state: &S) -> Result<Self, Self::Rejection> {
        use axum::response::IntoResponse;

        let (parts, body) = request.into_parts();

        if !is_json(&parts.headers) {
            return Err(error_response(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "invalid_request_error",
                "Unsupported Content-Type, expected: 'Content-Type: application/json'".to_string(),
                None,
            ));
        }

        let bytes = axum::body::to_bytes(body, BODY_LIMIT_BYTES).await.map_err(|err| {
            if std::error::Error::source(&err).is_some_and(|source| source.is::<http_body_util::LengthLimitError>()) {
                error_response(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "invalid_request_error",
                    format!("Request body is too large, limit is {BODY_LIMIT_BYTES} bytes"),
                    None,
                )
            } else {
                error_response(
                    StatusCode::BAD_REQUEST,
                    "invalid_request_error",
                    format!("Failed to read request body: {err}"),
                    None,
                )
            }
        })?;

        let value = match serde_json::from_slice::<T>(&bytes) {
            Ok(value) => value,
            Err(e) if e.classify() == serde_json::error::Category::Data => {
                return Err(deserialize_error(&e).into_response());
            }
            Err(e) => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    "invalid_request_error",
                    format!("Failed to parse request body: {e}"),
                    None,
                ));
            }
        };

        value.validate().map_err(IntoResponse::into_response)?;

        Ok(Self(value))
    }
}

fn is_json(headers: &http::HeaderMap) -> bool {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}
