use axum::{Json, extract::State};
use serde::Serialize;
use tollgate_core::{RegisteredTool, ToolRegistry};

#[derive(Serialize)]
pub struct ToolsResponse {
    pub services: Vec<String>,
    pub tools: Vec<RegisteredTool>,
}

/// REST mirror of the MCP tool listing
pub async fn tools_handler(State(registry): State<ToolRegistry>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        services: registry.service_names(),
        tools: registry.tools(),
    })
}
