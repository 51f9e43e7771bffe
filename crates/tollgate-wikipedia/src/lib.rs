//! Wikipedia search, summaries and article text

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod client;
mod types;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{Json, Router, extract::State, routing::post};
use serde_json::Value;
use tollgate_config::WikipediaConfig;
use tollgate_core::{Result, ServiceError, ToolService, ToolSpec, ValidatedJson, to_value, validate::parse_arguments};

pub use client::WikipediaClient;
pub use types::{
    ArticleRequest, ArticleResponse, SearchRequest, SearchResponse, SearchResult, SummaryRequest, SummaryResponse,
};

/// Build the Wikipedia client from configuration
pub fn build_service(config: &WikipediaConfig) -> anyhow::Result<Arc<WikipediaClient>> {
    let client = WikipediaClient::new(config).map_err(|e| anyhow::anyhow!("Failed to initialize Wikipedia service: {e}"))?;
    Ok(Arc::new(client))
}

/// Create the endpoint router for Wikipedia
pub fn endpoint_router() -> Router<Arc<WikipediaClient>> {
    Router::new()
        .route("/api/wikipedia/search", post(search))
        .route("/api/wikipedia/summary", post(summary))
        .route("/api/wikipedia/article", post(article))
}

async fn search(
    State(client): State<Arc<WikipediaClient>>,
    ValidatedJson(request): ValidatedJson<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    Ok(Json(client.search(&request).await?))
}

async fn summary(
    State(client): State<Arc<WikipediaClient>>,
    ValidatedJson(request): ValidatedJson<SummaryRequest>,
) -> Result<Json<SummaryResponse>> {
    Ok(Json(client.summary(&request).await?))
}

async fn article(
    State(client): State<Arc<WikipediaClient>>,
    ValidatedJson(request): ValidatedJson<ArticleRequest>,
) -> Result<Json<ArticleResponse>> {
    Ok(Json(client.article(&request).await?))
}

#[async_trait]
impl ToolService for WikipediaClient {
    fn name(&self) -> &str {
        client::SERVICE
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new::<SearchRequest>(
                "search",
                "Search Wikipedia articles. Returns titles, page ids and matching snippets.",
            ),
            ToolSpec::new::<SummaryRequest>(
                "summary",
                "Get the short description and lead-section summary of a Wikipedia article by exact title.",
            ),
            ToolSpec::new::<ArticleRequest>(
                "article",
                "Get the plain-text content of a Wikipedia article by exact title, truncated to max_chars.",
            ),
        ]
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value> {
        match tool {
            "search" => to_value(&self.search(&parse_arguments(arguments)?).await?),
            "summary" => to_value(&self.summary(&parse_arguments(arguments)?).await?),
            "article" => to_value(&self.article(&parse_arguments(arguments)?).await?),
            other => Err(ServiceError::UnknownTool(other.to_string())),
        }
    }
}
