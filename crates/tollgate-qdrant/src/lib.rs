//! Qdrant vector search over the REST API

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod client;
mod types;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde_json::Value;
use tollgate_config::QdrantConfig;
use tollgate_core::{Result, ServiceError, ToolService, ToolSpec, ValidatedJson, to_value, validate::parse_arguments};

pub use client::QdrantClient;
pub use types::{
    CollectionInfo, CollectionInfoRequest, CollectionsRequest, CollectionsResponse, Point, PointId, ScoredPoint,
    SearchRequest, SearchResponse, UpsertRequest, UpsertResponse,
};

pub fn build_service(config: &QdrantConfig) -> anyhow::Result<Arc<QdrantClient>> {
    let client = QdrantClient::new(config).map_err(|e| anyhow::anyhow!("Failed to initialize Qdrant service: {e}"))?;
    Ok(Arc::new(client))
}

/// Create the endpoint router for Qdrant
pub fn endpoint_router() -> Router<Arc<QdrantClient>> {
    Router::new()
        .route("/api/qdrant/collections", get(list_collections).post(collections))
        .route("/api/qdrant/collection_info", post(collection_info))
        .route("/api/qdrant/search", post(search))
        .route("/api/qdrant/upsert", post(upsert))
}

async fn list_collections(State(client): State<Arc<QdrantClient>>) -> Result<Json<CollectionsResponse>> {
    Ok(Json(client.collections().await?))
}

async fn collections(
    State(client): State<Arc<QdrantClient>>,
    ValidatedJson(_): ValidatedJson<CollectionsRequest>,
) -> Result<Json<CollectionsResponse>> {
    Ok(Json(client.collections().await?))
}

async fn collection_info(
    State(client): State<Arc<QdrantClient>>,
    ValidatedJson(request): ValidatedJson<CollectionInfoRequest>,
) -> Result<Json<CollectionInfo>> {
    Ok(Json(client.collection_info(&request).await?))
}

async fn search(
    State(client): State<Arc<QdrantClient>>,
    ValidatedJson(request): ValidatedJson<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    Ok(Json(client.search(&request).await?))
}

async fn upsert(
    State(client): State<Arc<QdrantClient>>,
    ValidatedJson(request): ValidatedJson<UpsertRequest>,
) -> Result<Json<UpsertResponse>> {
    Ok(Json(client.upsert(&request).await?))
}

#[async_trait]
impl ToolService for QdrantClient {
    fn name(&self) -> &str {
        client::SERVICE
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new::<CollectionsRequest>("collections", "List the names of all Qdrant collections."),
            ToolSpec::new::<CollectionInfoRequest>(
                "collection_info",
                "Get the status and point count of a Qdrant collection.",
            ),
            ToolSpec::new::<SearchRequest>(
                "search",
                "Find the points nearest to a query vector, optionally filtered, with their payloads.",
            ),
            ToolSpec::new::<UpsertRequest>(
                "upsert",
                "Insert or replace up to 1000 points with vectors and optional JSON payloads.",
            ),
        ]
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value> {
        match tool {
            "collections" => {
                let _: CollectionsRequest = parse_arguments(arguments)?;
                to_value(&self.collections().await?)
            }
            "collection_info" => to_value(&self.collection_info(&parse_arguments(arguments)?).await?),
            "search" => to_value(&self.search(&parse_arguments(arguments)?).await?),
            "upsert" => to_value(&self.upsert(&parse_arguments(arguments)?).await?),
            other => Err(ServiceError::UnknownTool(other.to_string())),
        }
    }
}
