//! YouTube video search, details and transcripts

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod cache;
mod client;
mod transcripts;
mod types;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{Json, Router, extract::State, routing::post};
use serde_json::Value;
use tollgate_config::YoutubeConfig;
use tollgate_core::{Result, ServiceError, ToolService, ToolSpec, ValidatedJson, to_value, validate::parse_arguments};

pub use client::YoutubeClient;
pub use transcripts::TranscriptStore;
pub use types::{
    SearchOrder, SearchRequest, SearchResponse, TranscriptRequest, TranscriptResponse, TranscriptSegment, VideoDetails,
    VideoRequest, VideoSummary,
};

pub fn build_service(config: &YoutubeConfig) -> anyhow::Result<Arc<YoutubeClient>> {
    let client = YoutubeClient::new(config).map_err(|e| anyhow::anyhow!("Failed to initialize YouTube service: {e}"))?;
    Ok(Arc::new(client))
}

/// Create the endpoint router for YouTube
pub fn endpoint_router() -> Router<Arc<YoutubeClient>> {
    Router::new()
        .route("/api/youtube/search", post(search))
        .route("/api/youtube/video", post(video))
        .route("/api/youtube/transcript", post(transcript))
}

async fn search(
    State(client): State<Arc<YoutubeClient>>,
    ValidatedJson(request): ValidatedJson<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    Ok(Json(client.search(&request).await?))
}

async fn video(
    State(client): State<Arc<YoutubeClient>>,
    ValidatedJson(request): ValidatedJson<VideoRequest>,
) -> Result<Json<VideoDetails>> {
    Ok(Json(client.video(&request).await?))
}

async fn transcript(
    State(client): State<Arc<YoutubeClient>>,
    ValidatedJson(request): ValidatedJson<TranscriptRequest>,
) -> Result<Json<TranscriptResponse>> {
    Ok(Json(client.transcript(&request).await?))
}

#[async_trait]
impl ToolService for YoutubeClient {
    fn name(&self) -> &str {
        client::SERVICE
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new::<SearchRequest>(
                "search",
                "Search YouTube videos. Returns ids, titles, channels, publish dates and thumbnails.",
            ),
            ToolSpec::new::<VideoRequest>(
                "video",
                "Get the description, duration, tags and view/like/comment counts of a YouTube video.",
            ),
            ToolSpec::new::<TranscriptRequest>(
                "transcript",
                "Get the timed caption transcript of a YouTube video in one language (default en).",
            ),
        ]
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value> {
        match tool {
            "search" => to_value(&self.search(&parse_arguments(arguments)?).await?),
            "video" => to_value(&self.video(&parse_arguments(arguments)?).await?),
            "transcript" => to_value(&self.transcript(&parse_arguments(arguments)?).await?),
            other => Err(ServiceError::UnknownTool(other.to_string())),
        }
    }
}
