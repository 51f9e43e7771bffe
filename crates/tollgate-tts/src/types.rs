use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tollgate_core::{Result, Validate, validate};

/// Text to synthesize into speech
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SynthesizeRequest {
    /// Text to speak (1-5000 characters)
    pub text: String,
    /// Provider-specific voice identifier
    pub voice: String,
    /// `elevenlabs` or `cartesia`; the configured default when omitted
    #[serde(default)]
    pub provider: Option<String>,
    /// Provider model; the provider's configured or built-in default when omitted
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub format: AudioFormat,
}

impl Validate for SynthesizeRequest {
    fn validate(&self) -> Result<()> {
        validate::length("text", &self.text, 1, 5000)?;
        validate::length("voice", &self.voice, 1, 128)?;

        if let Some(model) = &self.model {
            validate::length("model", model, 1, 128)?;
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
    /// Raw 16-bit little-endian PCM at 44.1 kHz
    Pcm,
}

impl AudioFormat {
    /// Content type reported when the upstream omits one
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
            Self::Pcm => "audio/pcm",
        }
    }
}

/// List the voices of one provider or of all configured providers
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct VoicesRequest {
    #[serde(default)]
    pub provider: Option<String>,
}

impl Validate for VoicesRequest {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoicesResponse {
    pub voices: Vec<Voice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voice {
    pub provider: String,
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Raw audio returned by a provider
#[derive(Debug, Clone)]
pub struct SpeechAudio {
    pub provider: String,
    pub content_type: String,
    pub audio: Vec<u8>,
}

/// Audio encoded for JSON transports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedSpeech {
    pub provider: String,
    pub content_type: String,
    pub audio_base64: String,
    pub bytes: usize,
}
