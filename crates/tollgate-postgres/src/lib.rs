//! Read-only Postgres queries and schema inspection

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod client;
mod types;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{Json, Router, extract::State, routing::post};
use serde_json::Value;
use tollgate_config::PostgresConfig;
use tollgate_core::{Result, ServiceError, ToolService, ToolSpec, ValidatedJson, to_value, validate::parse_arguments};

pub use client::PostgresClient;
pub use types::{
    Column, DescribeTableRequest, ListTablesRequest, QueryRequest, QueryResponse, TableDescription, TablesResponse,
};

/// Build the Postgres client; must be called inside a Tokio runtime
pub fn build_service(config: &PostgresConfig) -> anyhow::Result<Arc<PostgresClient>> {
    let client =
        PostgresClient::new(config).map_err(|e| anyhow::anyhow!("Failed to initialize Postgres service: {e}"))?;
    Ok(Arc::new(client))
}

/// Create the endpoint router for Postgres
pub fn endpoint_router() -> Router<Arc<PostgresClient>> {
    Router::new()
        .route("/api/postgres/list_tables", post(list_tables))
        .route("/api/postgres/describe_table", post(describe_table))
        .route("/api/postgres/query", post(query))
}

async fn list_tables(
    State(client): State<Arc<PostgresClient>>,
    ValidatedJson(request): ValidatedJson<ListTablesRequest>,
) -> Result<Json<TablesResponse>> {
    Ok(Json(client.list_tables(&request).await?))
}

async fn describe_table(
    State(client): State<Arc<PostgresClient>>,
    ValidatedJson(request): ValidatedJson<DescribeTableRequest>,
) -> Result<Json<TableDescription>> {
    Ok(Json(client.describe_table(&request).await?))
}

async fn query(
    State(client): State<Arc<PostgresClient>>,
    ValidatedJson(request): ValidatedJson<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    Ok(Json(client.query(&request).await?))
}

#[async_trait]
impl ToolService for PostgresClient {
    fn name(&self) -> &str {
        client::SERVICE
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new::<ListTablesRequest>("list_tables", "List the tables and views in a Postgres schema."),
            ToolSpec::new::<DescribeTableRequest>(
                "describe_table",
                "Describe the columns of a Postgres table: name, type, nullability and default.",
            ),
            ToolSpec::new::<QueryRequest>(
                "query",
                "Run a single read-only SQL statement (SELECT, WITH, VALUES or EXPLAIN) and return rows as JSON objects.",
            ),
        ]
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value> {
        match tool {
            "list_tables" => to_value(&self.list_tables(&parse_arguments(arguments)?).await?),
            "describe_table" => to_value(&self.describe_table(&parse_arguments(arguments)?).await?),
            "query" => to_value(&self.query(&parse_arguments(arguments)?).await?),
            other => Err(ServiceError::UnknownTool(other.to_string())),
        }
    }
}
