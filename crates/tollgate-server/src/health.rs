use axum::{Json, response::IntoResponse};
use serde_json::json;

/// Health check handler
///
/// Always `200 {"status":"ok"}`; upstreams are not contacted.
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
