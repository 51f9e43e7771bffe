use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use tollgate_config::TavilyConfig;
use tollgate_core::{Result, ServiceError, json_body, send_error};

use crate::types::{ExtractRequest, ExtractResponse, SearchRequest, SearchResponse};

pub(crate) const SERVICE: &str = "tavily";

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

/// Client for the Tavily search API
pub struct TavilyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    timeout: Duration,
}

impl TavilyClient {
    pub fn new(config: &TavilyConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ServiceError::Config("API key required for Tavily".to_string()))?;

        let base_url = config
            .base_url
            .as_ref()
            .map_or(DEFAULT_BASE_URL, url::Url::as_str)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            http: tollgate_core::http_client(),
            base_url,
            api_key,
            timeout: config.timeout(),
        })
    }

    /// Run a web search
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.post("search", request).await
    }

    /// Extract page content from URLs
    ///
    /// URLs Tavily could not fetch are reported in `failed_results`, not as
    /// an error.
    pub async fn extract(&self, request: &ExtractRequest) -> Result<ExtractResponse> {
        self.post("extract", request).await
    }

    async fn post<B, T>(&self, operation: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}/{operation}", self.base_url);
        tracing::debug!(url = %url, "calling tavily");

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| send_error(SERVICE, &e))?;

        json_body(SERVICE, response).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    use super::*;
    use crate::types::{SearchDepth, Topic};

    fn client(server: &MockServer) -> TavilyClient {
        let config: TavilyConfig =
            toml::from_str(&format!("api_key = \"tvly-test\"\nbase_url = \"{}\"", server.uri())).unwrap();
        TavilyClient::new(&config).unwrap()
    }

    fn search_request() -> SearchRequest {
        SearchRequest {
            query: "rust async runtimes".into(),
            search_depth: SearchDepth::Advanced,
            topic: Topic::News,
            max_results: 3,
            include_answer: true,
            include_domains: vec![],
            exclude_domains: vec!["example.com".into()],
        }
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let config: TavilyConfig = toml::from_str("").unwrap();
        assert!(matches!(TavilyClient::new(&config), Err(ServiceError::Config(_))));
    }

    #[tokio::test]
    async fn search_sends_bearer_and_options() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("authorization", "Bearer tvly-test"))
            .and(body_partial_json(json!({
                "query": "rust async runtimes",
                "search_depth": "advanced",
                "topic": "news",
                "max_results": 3,
                "include_answer": true,
                "exclude_domains": ["example.com"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": "rust async runtimes",
                "answer": "Tokio is the most widely used.",
                "results": [
                    {"title": "Tokio", "url": "https://tokio.rs", "content": "An async runtime", "score": 0.98}
                ],
                "response_time": 1.2
            })))
            .mount(&server)
            .await;

        let response = client(&server).search(&search_request()).await.unwrap();

        assert_eq!(response.answer.as_deref(), Some("Tokio is the most widely used."));
        assert_eq!(response.results[0].url, "https://tokio.rs");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "detail": {"error": "Unauthorized: missing or invalid API key."}
            })))
            .mount(&server)
            .await;

        let err = client(&server).search(&search_request()).await.unwrap_err();

        match err {
            ServiceError::Api { status, message, .. } => {
                assert_eq!(status, Some(401));
                assert_eq!(message, "Unauthorized: missing or invalid API key.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn extract_reports_failed_urls() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/extract"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"url": "https://a.example", "raw_content": "hello"}],
                "failed_results": [{"url": "https://b.example", "error": "timeout"}],
                "response_time": 0.4
            })))
            .mount(&server)
            .await;

        let response = client(&server)
            .extract(&ExtractRequest {
                urls: vec!["https://a.example".into(), "https://b.example".into()],
            })
            .await
            .unwrap();

        assert_eq!(response.results[0].raw_content, "hello");
        assert_eq!(response.failed_results[0].error, "timeout");
    }

    #[tokio::test]
    async fn unreachable_upstream_is_client_error() {
        let config: TavilyConfig =
            toml::from_str("api_key = \"k\"\nbase_url = \"http://127.0.0.1:1\"\ntimeout_secs = 2").unwrap();
        let err = TavilyClient::new(&config)
            .unwrap()
            .search(&search_request())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Client(_)));
    }
}
