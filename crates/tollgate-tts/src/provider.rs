pub mod cartesia;
pub mod elevenlabs;

use async_trait::async_trait;
use tollgate_core::Result;

use crate::types::{AudioFormat, SpeechAudio, Voice};

/// Synthesis parameters after provider and model resolution
#[derive(Debug)]
pub struct Synthesis<'a> {
    pub text: &'a str,
    pub voice: &'a str,
    pub model: Option<&'a str>,
    pub format: AudioFormat,
}

/// Trait for TTS provider implementations
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Synthesize text to speech
    async fn synthesize(&self, request: &Synthesis<'_>) -> Result<SpeechAudio>;

    /// Voices available to the configured account
    async fn voices(&self) -> Result<Vec<Voice>>;

    /// Get the provider name
    fn name(&self) -> &str;
}

/// Read the upstream content type, falling back to the requested format
pub(crate) fn content_type(response: &reqwest::Response, format: AudioFormat) -> String {
    response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(format.content_type())
        .to_string()
}
