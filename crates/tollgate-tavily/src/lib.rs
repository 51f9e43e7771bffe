//! Tavily web search and page extraction

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod client;
mod types;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{Json, Router, extract::State, routing::post};
use serde_json::Value;
use tollgate_config::TavilyConfig;
use tollgate_core::{Result, ServiceError, ToolService, ToolSpec, ValidatedJson, to_value, validate::parse_arguments};

pub use client::TavilyClient;
pub use types::{
    ExtractRequest, ExtractResponse, ExtractResult, FailedResult, SearchDepth, SearchRequest, SearchResponse,
    SearchResult, Topic,
};

/// Build the Tavily client from configuration
pub fn build_service(config: &TavilyConfig) -> anyhow::Result<Arc<TavilyClient>> {
    let client = TavilyClient::new(config).map_err(|e| anyhow::anyhow!("Failed to initialize Tavily service: {e}"))?;
    Ok(Arc::new(client))
}

/// Create the endpoint router for Tavily
pub fn endpoint_router() -> Router<Arc<TavilyClient>> {
    Router::new()
        .route("/api/tavily/search", post(search))
        .route("/api/tavily/extract", post(extract))
}

async fn search(
    State(client): State<Arc<TavilyClient>>,
    ValidatedJson(request): ValidatedJson<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    tracing::debug!(depth = ?request.search_depth, max_results = request.max_results, "tavily search");
    Ok(Json(client.search(&request).await?))
}

async fn extract(
    State(client): State<Arc<TavilyClient>>,
    ValidatedJson(request): ValidatedJson<ExtractRequest>,
) -> Result<Json<ExtractResponse>> {
    Ok(Json(client.extract(&request).await?))
}

#[async_trait]
impl ToolService for TavilyClient {
    fn name(&self) -> &str {
        client::SERVICE
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new::<SearchRequest>(
                "search",
                "Search the web with Tavily. Returns ranked results with extracted content and an optional answer.",
            ),
            ToolSpec::new::<ExtractRequest>(
                "extract",
                "Extract the main text content of up to 20 web pages.",
            ),
        ]
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value> {
        match tool {
            "search" => to_value(&self.search(&parse_arguments(arguments)?).await?),
            "extract" => to_value(&self.extract(&parse_arguments(arguments)?).await?),
            other => Err(ServiceError::UnknownTool(other.to_string())),
        }
    }
}
