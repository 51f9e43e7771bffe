//! arXiv paper search and lookup over the public Atom API

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod client;
mod types;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{Json, Router, extract::State, routing::post};
use serde_json::Value;
use tollgate_config::ArxivConfig;
use tollgate_core::{Result, ServiceError, ToolService, ToolSpec, ValidatedJson, to_value, validate::parse_arguments};

pub use client::ArxivClient;
pub use types::{ArxivSearchResult, PaperRequest, SearchRequest, SearchResponse, SortBy, SortOrder};

/// Build the arXiv client from configuration
pub fn build_service(config: &ArxivConfig) -> anyhow::Result<Arc<ArxivClient>> {
    let client = ArxivClient::new(config).map_err(|e| anyhow::anyhow!("Failed to initialize arXiv service: {e}"))?;
    Ok(Arc::new(client))
}

/// Create the endpoint router for arXiv
pub fn endpoint_router() -> Router<Arc<ArxivClient>> {
    Router::new()
        .route("/api/arxiv/search", post(search))
        .route("/api/arxiv/paper", post(paper))
}

async fn search(
    State(client): State<Arc<ArxivClient>>,
    ValidatedJson(request): ValidatedJson<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    Ok(Json(client.search(&request).await?))
}

async fn paper(
    State(client): State<Arc<ArxivClient>>,
    ValidatedJson(request): ValidatedJson<PaperRequest>,
) -> Result<Json<ArxivSearchResult>> {
    Ok(Json(client.paper(&request).await?))
}

#[async_trait]
impl ToolService for ArxivClient {
    fn name(&self) -> &str {
        client::SERVICE
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new::<SearchRequest>(
                "search",
                "Search arXiv papers. Returns ids, titles, authors, abstracts, categories and PDF links.",
            ),
            ToolSpec::new::<PaperRequest>(
                "paper",
                "Get the title, authors, abstract and links of one arXiv paper by id (e.g. 2301.00001).",
            ),
        ]
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value> {
        match tool {
            "search" => to_value(&self.search(&parse_arguments(arguments)?).await?),
            "paper" => to_value(&self.paper(&parse_arguments(arguments)?).await?),
            other => Err(ServiceError::UnknownTool(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers::method};

    use super::*;

    async fn app(server: &MockServer) -> Router {
        let config: ArxivConfig = toml::from_str(&format!("base_url = \"{}\"", server.uri())).unwrap();
        endpoint_router().with_state(build_service(&config).unwrap())
    }

    #[tokio::test]
    async fn malformed_id_is_rejected_before_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let response = app(&server)
            .await
            .oneshot(
                Request::post("/api/arxiv/paper")
                    .header(http::header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({"id": "not an id"}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn paper_ids_accept_both_schemes() {
        for id in ["2301.00001", "2301.00001v3", "1501.0001", "hep-th/9901001", "math.GT/0309136v1"] {
            assert!(parse_arguments::<PaperRequest>(json!({"id": id})).is_ok(), "{id}");
        }
        assert!(parse_arguments::<PaperRequest>(json!({"id": "arxiv.org/abs/2301.00001"})).is_err());
    }

    #[test]
    fn sort_options_use_api_spelling() {
        let request: SearchRequest =
            parse_arguments(json!({"query": "q", "sort_by": "submittedDate", "sort_order": "ascending"})).unwrap();
        assert_eq!(request.sort_by, SortBy::SubmittedDate);
        assert_eq!(request.sort_order, SortOrder::Ascending);
        assert_eq!(request.max_results, 10);

        assert!(parse_arguments::<SearchRequest>(json!({"query": "q", "max_results": 101})).is_err());
    }

    #[test]
    fn tools_cover_every_route() {
        let config: ArxivConfig = toml::from_str("").unwrap();
        let client = ArxivClient::new(&config).unwrap();
        let names: Vec<String> = client.tools().into_iter().map(|tool| tool.name).collect();
        assert_eq!(names, vec!["search", "paper"]);
    }
}
