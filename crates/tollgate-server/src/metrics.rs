use std::time::Instant;

use axum::{
    Json,
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use tollgate_telemetry::{MetricsSnapshot, RequestMetrics};

/// Label for requests that matched no route
const UNMATCHED: &str = "unmatched";

/// Count every request by matched route, status and latency
pub async fn metrics_middleware(metrics: RequestMetrics, request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED.to_string(), |path| path.as_str().to_string());

    let started = Instant::now();
    let response = next.run(request).await;

    metrics.record(&route, response.status().as_u16(), started.elapsed());

    response
}

pub async fn metrics_handler(State(metrics): State<RequestMetrics>) -> Json<MetricsSnapshot> {
    Json(metrics.snapshot())
}
