use async_trait::async_trait;
use url::Url;

use crate::types::{FacilitatorRequest, PaymentPayload, PaymentRequirements, SettleResponse, VerifyResponse, X402_VERSION};

/// Errors talking to the facilitator
#[derive(Debug, thiserror::Error)]
pub enum FacilitatorError {
    /// HTTP transport or decoding error
    #[error("facilitator request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The facilitator returned a non-success status
    #[error("facilitator error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Verifies and settles payment payloads
#[async_trait]
pub trait Facilitator: Send + Sync {
    /// Check that a payload satisfies the requirements without settling it
    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, FacilitatorError>;

    /// Execute the payment on chain
    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, FacilitatorError>;
}

/// Facilitator reached over HTTP (`POST {base}/verify`, `POST {base}/settle`)
#[derive(Clone)]
pub struct HttpFacilitator {
    http: reqwest::Client,
    base_url: String,
}

impl HttpFacilitator {
    pub fn new(base_url: &Url) -> Self {
        Self {
            http: tollgate_core::http_client(),
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        }
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<T, FacilitatorError> {
        let body = FacilitatorRequest {
            x402_version: X402_VERSION,
            payment_payload: payload,
            payment_requirements: requirements,
        };

        let response = self
            .http
            .post(format!("{}/{operation}", self.base_url))
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(FacilitatorError::Api { status, message })
        }
    }
}

#[async_trait]
impl Facilitator for HttpFacilitator {
    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, FacilitatorError> {
        self.post("verify", payload, requirements).await
    }

    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, FacilitatorError> {
        self.post("settle", payload, requirements).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, method, path},
    };

    use super::*;

    fn requirements() -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".into(),
            network: "base-sepolia".into(),
            max_amount_required: "10000".into(),
            resource: "http://localhost/api/tavily/search".into(),
            description: "search".into(),
            mime_type: "application/json".into(),
            pay_to: "0x1111111111111111111111111111111111111111".into(),
            max_timeout_seconds: 60,
            asset: "0x036CbD53842c5426634e7929541eC2318f3dCF7e".into(),
            extra: None,
        }
    }

    fn payload() -> PaymentPayload {
        PaymentPayload {
            x402_version: 1,
            scheme: "exact".into(),
            network: "base-sepolia".into(),
            payload: json!({"signature": "0xabc"}),
        }
    }

    #[tokio::test]
    async fn verify_posts_payload_and_requirements() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/facilitator/verify"))
            .and(body_partial_json(json!({
                "x402Version": 1,
                "paymentPayload": {"scheme": "exact"},
                "paymentRequirements": {"maxAmountRequired": "10000"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"isValid": true, "payer": "0xpayer"})))
            .mount(&server)
            .await;

        let base = Url::parse(&format!("{}/facilitator", server.uri())).unwrap();
        let facilitator = HttpFacilitator::new(&base);

        let response = facilitator.verify(&payload(), &requirements()).await.unwrap();
        assert!(response.is_valid);
        assert_eq!(response.payer.as_deref(), Some("0xpayer"));
    }

    #[tokio::test]
    async fn settle_error_status_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/settle"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let base = Url::parse(&format!("{}/", server.uri())).unwrap();
        let err = HttpFacilitator::new(&base)
            .settle(&payload(), &requirements())
            .await
            .unwrap_err();

        assert!(matches!(err, FacilitatorError::Api { status: 500, ref message } if message == "boom"));
    }
}
