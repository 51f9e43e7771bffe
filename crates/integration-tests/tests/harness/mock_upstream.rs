//! Mock upstream for integration tests
//!
//! Serves just enough of the Wikipedia, OpenWeatherMap and x402 facilitator
//! APIs to drive the gateway, and counts what it receives.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing,
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Transaction hash returned by a successful settlement
pub const TRANSACTION: &str = "0xfeedbeef";

/// Payer reported by the facilitator
pub const PAYER: &str = "0x2222222222222222222222222222222222222222";

pub struct MockUpstream {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

#[derive(Default)]
struct MockState {
    upstream_calls: AtomicU32,
    verify_calls: AtomicU32,
    settle_calls: AtomicU32,
    reject_payments: AtomicBool,
}

impl MockUpstream {
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(MockState::default());

        let app = Router::new()
            .route("/w/api.php", routing::get(wikipedia_search))
            .route("/api/rest_v1/page/summary/{title}", routing::get(wikipedia_summary))
            .route("/data/2.5/weather", routing::get(current_weather))
            .route("/facilitator/verify", routing::post(verify))
            .route("/facilitator/settle", routing::post(settle))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn facilitator_url(&self) -> String {
        format!("http://{}/facilitator", self.addr)
    }

    /// Make the facilitator report every payment as invalid
    pub fn reject_payments(&self) {
        self.state.reject_payments.store(true, Ordering::SeqCst);
    }

    /// Requests that reached a service endpoint (not the facilitator)
    pub fn upstream_calls(&self) -> u32 {
        self.state.upstream_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> u32 {
        self.state.verify_calls.load(Ordering::SeqCst)
    }

    pub fn settle_calls(&self) -> u32 {
        self.state.settle_calls.load(Ordering::SeqCst)
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn wikipedia_search(State(state): State<Arc<MockState>>, Query(params): Query<HashMap<String, String>>) -> Response {
    state.upstream_calls.fetch_add(1, Ordering::SeqCst);

    let query = params.get("srsearch").cloned().unwrap_or_default();

    Json(json!({
        "query": {
            "searchinfo": {"totalhits": 1},
            "search": [{
                "title": format!("{query} (disambiguation)"),
                "pageid": 42,
                "snippet": format!("<span class=\"searchmatch\">{query}</span> may refer to"),
                "wordcount": 120
            }]
        }
    }))
    .into_response()
}

async fn wikipedia_summary(State(state): State<Arc<MockState>>, Path(title): Path<String>) -> Response {
    state.upstream_calls.fetch_add(1, Ordering::SeqCst);

    if title == "Missing_Page" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"title": "Not found.", "detail": "Page or revision not found."})),
        )
            .into_response();
    }

    Json(json!({
        "title": title.replace('_', " "),
        "description": "Mock article",
        "extract": "Lead section.",
    }))
    .into_response()
}

async fn current_weather(State(state): State<Arc<MockState>>, Query(params): Query<HashMap<String, String>>) -> Response {
    state.upstream_calls.fetch_add(1, Ordering::SeqCst);

    if params.get("appid").map(String::as_str) != Some("test-key") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"cod": 401, "message": "Invalid API key"}))).into_response();
    }

    Json(json!({
        "name": params.get("q").cloned().unwrap_or_default(),
        "sys": {"country": "NO"},
        "main": {"temp": 4.5, "feels_like": 1.0, "humidity": 80, "pressure": 1012},
        "weather": [{"description": "light rain"}],
        "wind": {"speed": 5.1}
    }))
    .into_response()
}

async fn verify(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Json<Value> {
    state.verify_calls.fetch_add(1, Ordering::SeqCst);

    let signed = body["paymentPayload"]["payload"]["signature"].is_string();

    if state.reject_payments.load(Ordering::SeqCst) || !signed {
        return Json(json!({"isValid": false, "invalidReason": "insufficient_funds", "payer": PAYER}));
    }

    Json(json!({"isValid": true, "payer": PAYER}))
}

async fn settle(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Json<Value> {
    state.settle_calls.fetch_add(1, Ordering::SeqCst);

    Json(json!({
        "success": true,
        "transaction": TRANSACTION,
        "network": body["paymentRequirements"]["network"],
        "payer": PAYER
    }))
}
