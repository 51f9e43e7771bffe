use std::sync::Arc;

use axum::{
    Json,
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use tollgate_config::{PaymentConfig, PricedRoute};
use url::Url;

use crate::{
    facilitator::{Facilitator, HttpFacilitator},
    pricing::{RouteTable, usdc},
    types::{PaymentPayload, PaymentRequiredBody, PaymentRequirements, SettleResponse, X402_VERSION},
};

/// Request header carrying the base64 payment payload
pub const X_PAYMENT: HeaderName = HeaderName::from_static("x-payment");

/// Response header carrying the base64 settlement result
pub const X_PAYMENT_RESPONSE: HeaderName = HeaderName::from_static("x-payment-response");

/// MCP `_meta` key carrying the payment payload of a tool call
pub const PAYMENT_META_KEY: &str = "x402/payment";

/// MCP `_meta` key carrying the settlement of a paid tool call
pub const PAYMENT_RESPONSE_META_KEY: &str = "x402/payment-response";

/// Settings and collaborators of the payment gate
pub struct PaymentGate {
    routes: RouteTable,
    facilitator: Arc<dyn Facilitator>,
    network: String,
    pay_to: String,
    asset: String,
    asset_name: &'static str,
    asset_version: &'static str,
    max_timeout_seconds: u64,
    public_base_url: Option<Url>,
}

/// A payload the facilitator accepted, waiting for settlement
#[derive(Debug)]
pub struct VerifiedPayment {
    payload: PaymentPayload,
    requirements: PaymentRequirements,
    payer: Option<String>,
}

impl VerifiedPayment {
    pub fn payer(&self) -> Option<&str> {
        self.payer.as_deref()
    }
}

impl PaymentGate {
    /// Build the gate from configuration, `None` when payment is disabled
    pub fn from_config(config: &PaymentConfig) -> Option<Arc<Self>> {
        if !config.enabled {
            return None;
        }

        let facilitator = Arc::new(HttpFacilitator::new(&config.facilitator_url));
        Some(Arc::new(Self::new(config, facilitator)))
    }

    /// Build the gate with an explicit facilitator
    pub fn new(config: &PaymentConfig, facilitator: Arc<dyn Facilitator>) -> Self {
        let asset = usdc(config.network);

        tracing::debug!(
            network = %config.network,
            routes = config.routes.len(),
            "x402 payment gate enabled"
        );

        Self {
            routes: RouteTable::new(config.routes.clone()),
            facilitator,
            network: config.network.as_str().to_string(),
            pay_to: config.pay_to.clone().unwrap_or_default(),
            asset: config.asset.clone().unwrap_or_else(|| asset.address.to_string()),
            asset_name: asset.name,
            asset_version: asset.version,
            max_timeout_seconds: config.max_timeout_seconds,
            public_base_url: config.public_base_url.clone(),
        }
    }

    /// Priced route covering `path`, if any
    pub fn price(&self, path: &str) -> Option<&PricedRoute> {
        self.routes.find(path)
    }

    /// Requirements a client must satisfy for a priced route
    pub fn requirements(&self, route: &PricedRoute, resource: String) -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".to_string(),
            network: self.network.clone(),
            max_amount_required: route.price.atomic_units().to_string(),
            resource,
            description: route
                .description
                .clone()
                .unwrap_or_else(|| format!("Access to {}", route.path)),
            mime_type: "application/json".to_string(),
            pay_to: self.pay_to.clone(),
            max_timeout_seconds: self.max_timeout_seconds,
            asset: self.asset.clone(),
            extra: Some(serde_json::json!({
                "name": self.asset_name,
                "version": self.asset_version,
            })),
        }
    }

    /// Absolute URL of a request as seen by the client
    pub fn resource_url(&self, headers: &HeaderMap, path_and_query: &str) -> String {
        if let Some(base) = &self.public_base_url {
            return format!("{}{path_and_query}", base.as_str().trim_end_matches('/'));
        }

        let host = headers
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("localhost");
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("http");

        format!("{scheme}://{host}{path_and_query}")
    }

    /// Check a payload against the requirements and have the facilitator verify it
    pub async fn verify(
        &self,
        requirements: PaymentRequirements,
        payload: PaymentPayload,
    ) -> Result<VerifiedPayment, PaymentRequiredBody> {
        if payload.scheme != requirements.scheme || payload.network != requirements.network {
            return Err(challenge(requirements, "No matching payment requirements", None));
        }

        match self.facilitator.verify(&payload, &requirements).await {
            Ok(verification) if verification.is_valid => Ok(VerifiedPayment {
                payload,
                requirements,
                payer: verification.payer,
            }),
            Ok(verification) => {
                let reason = verification
                    .invalid_reason
                    .unwrap_or_else(|| "Payment verification failed".to_string());
                tracing::info!(reason = %reason, payer = ?verification.payer, "payment rejected");
                Err(challenge(requirements, &reason, verification.payer))
            }
            Err(e) => {
                tracing::error!(error = %e, "payment verification failed");
                Err(challenge(requirements, &e.to_string(), None))
            }
        }
    }

    /// Settle a verified payment once the paid work succeeded
    pub async fn settle(&self, payment: VerifiedPayment) -> Result<SettleResponse, PaymentRequiredBody> {
        let VerifiedPayment {
            payload,
            requirements,
            payer,
        } = payment;

        match self.facilitator.settle(&payload, &requirements).await {
            Ok(settlement) if settlement.success => {
                tracing::info!(
                    transaction = %settlement.transaction,
                    payer = ?settlement.payer,
                    amount = %requirements.max_amount_required,
                    "payment settled"
                );
                Ok(settlement)
            }
            Ok(settlement) => {
                tracing::error!(reason = ?settlement.error_reason, "payment settlement rejected");
                Err(challenge(requirements, "Settle failed", payer))
            }
            Err(e) => {
                tracing::error!(error = %e, "payment settlement failed");
                Err(challenge(requirements, "Settle failed", payer))
            }
        }
    }
}

/// Middleware that demands an x402 payment for priced routes
///
/// 1. Unpriced paths pass through untouched
/// 2. A missing, undecodable or mismatched `X-PAYMENT` header → 402
/// 3. The facilitator must verify the payload → 402 otherwise
/// 4. Successful handler responses are settled and carry `X-PAYMENT-RESPONSE`
pub async fn payment_middleware(gate: Arc<PaymentGate>, request: Request, next: Next) -> Response {
    let Some(route) = gate.price(request.uri().path()) else {
        return next.run(request).await;
    };

    let path_and_query = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path(), |pq| pq.as_str());
    let requirements = gate.requirements(route, gate.resource_url(request.headers(), path_and_query));

    let Some(header) = request.headers().get(&X_PAYMENT) else {
        tracing::debug!(path = %request.uri().path(), "payment required");
        return payment_required(challenge(requirements, "X-PAYMENT header is required", None));
    };

    let Some(payload) = decode_payment_header(header.as_bytes()) else {
        return payment_required(challenge(requirements, "Invalid payment header format", None));
    };

    let payment = match gate.verify(requirements, payload).await {
        Ok(payment) => payment,
        Err(body) => return payment_required(body),
    };

    let mut response = next.run(request).await;

    if !response.status().is_success() {
        return response;
    }

    match gate.settle(payment).await {
        Ok(settlement) => {
            if let Some(value) = encode_settlement(&settlement) {
                response.headers_mut().insert(X_PAYMENT_RESPONSE, value);
            }
            response
        }
        Err(body) => payment_required(body),
    }
}

/// Decode a base64 `X-PAYMENT` value
pub fn decode_payment_header(value: &[u8]) -> Option<PaymentPayload> {
    let bytes = STANDARD.decode(value).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// 402 body offering the given requirements
pub fn challenge(requirements: PaymentRequirements, error: &str, payer: Option<String>) -> PaymentRequiredBody {
    PaymentRequiredBody {
        x402_version: X402_VERSION,
        error: error.to_string(),
        accepts: vec![requirements],
        payer,
    }
}

fn encode_settlement(settlement: &SettleResponse) -> Option<HeaderValue> {
    let json = serde_json::to_vec(settlement).ok()?;
    HeaderValue::from_str(&STANDARD.encode(json)).ok()
}

fn payment_required(body: PaymentRequiredBody) -> Response {
    (StatusCode::PAYMENT_REQUIRED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::{Router, body::Body, routing::post};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::{facilitator::FacilitatorError, types::VerifyResponse};

    const PAY_TO: &str = "0x1111111111111111111111111111111111111111";

    #[derive(Default)]
    struct FakeFacilitator {
        reject: Option<&'static str>,
        fail_settle: bool,
        settled: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Facilitator for FakeFacilitator {
        async fn verify(
            &self,
            _payload: &PaymentPayload,
            _requirements: &PaymentRequirements,
        ) -> Result<VerifyResponse, FacilitatorError> {
            Ok(VerifyResponse {
                is_valid: self.reject.is_none(),
                invalid_reason: self.reject.map(str::to_string),
                payer: Some("0xpayer".to_string()),
            })
        }

        async fn settle(
            &self,
            _payload: &PaymentPayload,
            requirements: &PaymentRequirements,
        ) -> Result<SettleResponse, FacilitatorError> {
            if self.fail_settle {
                return Err(FacilitatorError::Api {
                    status: 500,
                    message: "down".into(),
                });
            }

            self.settled
                .lock()
                .unwrap()
                .push(requirements.max_amount_required.clone());

            Ok(SettleResponse {
                success: true,
                error_reason: None,
                transaction: "0xtx".into(),
                network: requirements.network.clone(),
                payer: Some("0xpayer".into()),
            })
        }
    }

    fn config() -> PaymentConfig {
        toml::from_str(&format!(
            r#"
            enabled = true
            pay_to = "{PAY_TO}"

            [[routes]]
            path = "/api/paid/*"
            price = "$0.01"
            description = "Paid search"
            "#
        ))
        .unwrap()
    }

    fn app(facilitator: Arc<FakeFacilitator>) -> Router {
        let gate = Arc::new(PaymentGate::new(&config(), facilitator));

        Router::new()
            .route("/api/paid/search", post(|| async { Json(json!({"results": []})) }))
            .route("/api/paid/broken", post(|| async { StatusCode::BAD_GATEWAY }))
            .route("/api/free", post(|| async { "free" }))
            .layer(axum::middleware::from_fn(move |req, next| {
                let gate = Arc::clone(&gate);
                async move { payment_middleware(gate, req, next).await }
            }))
    }

    fn payment_header(network: &str) -> String {
        let payload = json!({
            "x402Version": 1,
            "scheme": "exact",
            "network": network,
            "payload": {"signature": "0xsig"}
        });
        STANDARD.encode(payload.to_string())
    }

    async fn send(app: Router, path: &str, payment: Option<String>) -> Response {
        let mut request = http::Request::builder()
            .method("POST")
            .uri(path)
            .header(http::header::HOST, "gateway.test");

        if let Some(payment) = payment {
            request = request.header(X_PAYMENT, payment);
        }

        app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn free_routes_pass_through() {
        let response = send(app(Arc::default()), "/api/free", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_header_returns_challenge() {
        let response = send(app(Arc::default()), "/api/paid/search", None).await;
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

        let body = json_body(response).await;
        assert_eq!(body["x402Version"], 1);
        assert_eq!(body["error"], "X-PAYMENT header is required");

        let accepts = &body["accepts"][0];
        assert_eq!(accepts["scheme"], "exact");
        assert_eq!(accepts["network"], "base-sepolia");
        assert_eq!(accepts["maxAmountRequired"], "10000");
        assert_eq!(accepts["resource"], "http://gateway.test/api/paid/search");
        assert_eq!(accepts["description"], "Paid search");
        assert_eq!(accepts["payTo"], PAY_TO);
        assert_eq!(accepts["asset"], "0x036CbD53842c5426634e7929541eC2318f3dCF7e");
        assert_eq!(accepts["extra"]["name"], "USDC");
    }

    #[tokio::test]
    async fn garbage_header_is_rejected() {
        let response = send(app(Arc::default()), "/api/paid/search", Some("%%%".into())).await;
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(json_body(response).await["error"], "Invalid payment header format");
    }

    #[tokio::test]
    async fn wrong_network_is_rejected() {
        let response = send(app(Arc::default()), "/api/paid/search", Some(payment_header("base"))).await;
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(json_body(response).await["error"], "No matching payment requirements");
    }

    #[tokio::test]
    async fn invalid_payment_reports_reason() {
        let facilitator = Arc::new(FakeFacilitator {
            reject: Some("insufficient_funds"),
            ..Default::default()
        });

        let response = send(app(facilitator), "/api/paid/search", Some(payment_header("base-sepolia"))).await;
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

        let body = json_body(response).await;
        assert_eq!(body["error"], "insufficient_funds");
        assert_eq!(body["payer"], "0xpayer");
    }

    #[tokio::test]
    async fn valid_payment_is_settled() {
        let facilitator = Arc::new(FakeFacilitator::default());

        let response = send(
            app(Arc::clone(&facilitator)),
            "/api/paid/search",
            Some(payment_header("base-sepolia")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);

        let header = response.headers().get(X_PAYMENT_RESPONSE).unwrap();
        let settlement: Value = serde_json::from_slice(&STANDARD.decode(header.as_bytes()).unwrap()).unwrap();
        assert_eq!(settlement["success"], true);
        assert_eq!(settlement["transaction"], "0xtx");

        assert_eq!(*facilitator.settled.lock().unwrap(), vec!["10000".to_string()]);
    }

    #[tokio::test]
    async fn failed_handler_is_not_settled() {
        let facilitator = Arc::new(FakeFacilitator::default());

        let response = send(
            app(Arc::clone(&facilitator)),
            "/api/paid/broken",
            Some(payment_header("base-sepolia")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.headers().get(X_PAYMENT_RESPONSE).is_none());
        assert!(facilitator.settled.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn settle_failure_replaces_response() {
        let facilitator = Arc::new(FakeFacilitator {
            fail_settle: true,
            ..Default::default()
        });

        let response = send(app(facilitator), "/api/paid/search", Some(payment_header("base-sepolia"))).await;
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(json_body(response).await["error"], "Settle failed");
    }

    #[test]
    fn public_base_url_wins_over_host() {
        let mut config = config();
        config.public_base_url = Some(Url::parse("https://api.example.com/").unwrap());
        let gate = PaymentGate::new(&config, Arc::new(FakeFacilitator::default()));

        let mut headers = HeaderMap::new();
        headers.insert(http::header::HOST, HeaderValue::from_static("internal:8080"));

        assert_eq!(
            gate.resource_url(&headers, "/api/paid/search?q=1"),
            "https://api.example.com/api/paid/search?q=1"
        );
        assert!(gate.price("/api/paid").is_some());
        assert!(gate.price("/api/free").is_none());
    }

    #[tokio::test]
    async fn verified_payment_settles_directly() {
        let facilitator = Arc::new(FakeFacilitator::default());
        let gate = PaymentGate::new(&config(), Arc::clone(&facilitator) as Arc<dyn Facilitator>);
        let route = gate.price("/api/paid/search").unwrap();
        let requirements = gate.requirements(route, "mcp://tool/paid_search".into());

        let payload = decode_payment_header(payment_header("base-sepolia").as_bytes()).unwrap();
        let payment = gate.verify(requirements, payload).await.unwrap();
        assert_eq!(payment.payer(), Some("0xpayer"));

        let settlement = gate.settle(payment).await.unwrap();
        assert_eq!(settlement.transaction, "0xtx");
        assert_eq!(facilitator.settled.lock().unwrap().len(), 1);
    }
}
