//! Text-to-speech through `ElevenLabs` and Cartesia

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod provider;
mod server;
mod types;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::Value;
use tollgate_config::TtsConfig;
use tollgate_core::{Result, ServiceError, ToolService, ToolSpec, ValidatedJson, to_value, validate::parse_arguments};

pub use provider::TtsProvider;
pub use server::{TtsService, TtsServiceBuilder};
pub use types::{
    AudioFormat, EncodedSpeech, SpeechAudio, SynthesizeRequest, Voice, VoicesRequest, VoicesResponse,
};

/// Build the TTS service from configuration
pub fn build_service(config: &TtsConfig) -> anyhow::Result<Arc<TtsService>> {
    let service = TtsServiceBuilder::new(config)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to initialize TTS service: {e}"))?;
    Ok(Arc::new(service))
}

/// Create the endpoint router for TTS
pub fn endpoint_router() -> Router<Arc<TtsService>> {
    Router::new()
        .route("/api/tts/synthesize", post(synthesize))
        .route("/api/tts/voices", get(all_voices).post(voices))
}

/// Respond with the raw audio and the provider's content type
async fn synthesize(
    State(service): State<Arc<TtsService>>,
    ValidatedJson(request): ValidatedJson<SynthesizeRequest>,
) -> Result<Response> {
    tracing::debug!(provider = ?request.provider, format = ?request.format, "TTS speech handler called");

    let speech = service.synthesize(&request).await?;

    Ok(([(http::header::CONTENT_TYPE, speech.content_type)], speech.audio).into_response())
}

async fn all_voices(State(service): State<Arc<TtsService>>) -> Result<Json<VoicesResponse>> {
    Ok(Json(service.voices(&VoicesRequest::default()).await?))
}

async fn voices(
    State(service): State<Arc<TtsService>>,
    ValidatedJson(request): ValidatedJson<VoicesRequest>,
) -> Result<Json<VoicesResponse>> {
    Ok(Json(service.voices(&request).await?))
}

#[async_trait]
impl ToolService for TtsService {
    fn name(&self) -> &str {
        server::SERVICE
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new::<SynthesizeRequest>(
                "synthesize",
                "Convert text to speech. Returns base64-encoded audio with its content type.",
            ),
            ToolSpec::new::<VoicesRequest>(
                "voices",
                "List the voices available from one or all configured TTS providers.",
            ),
        ]
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value> {
        match tool {
            "synthesize" => to_value(&self.synthesize_encoded(&parse_arguments(arguments)?).await?),
            "voices" => to_value(&self.voices(&parse_arguments(arguments)?).await?),
            other => Err(ServiceError::UnknownTool(other.to_string())),
        }
    }
}
