use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tollgate_core::{Result, RetryPolicy, ServiceError, check_status, json_body, retry_with_backoff, send_error};

use super::{Synthesis, TtsProvider, content_type};
use crate::types::{AudioFormat, SpeechAudio, Voice};

pub(crate) const NAME: &str = "cartesia";

const DEFAULT_API_URL: &str = "https://api.cartesia.ai";
const DEFAULT_MODEL: &str = "sonic-2";
const API_VERSION: &str = "2024-06-10";
const SAMPLE_RATE: u32 = 44_100;

/// Cartesia Sonic TTS provider
pub struct CartesiaProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    timeout: Duration,
}

impl CartesiaProvider {
    pub fn new(api_key: SecretString, base_url: Option<&str>, model: Option<&str>, timeout: Duration) -> Self {
        Self {
            client: tollgate_core::http_client(),
            base_url: base_url.unwrap_or(DEFAULT_API_URL).trim_end_matches('/').to_string(),
            api_key,
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            timeout,
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("X-API-Key", self.api_key.expose_secret())
            .header("Cartesia-Version", API_VERSION)
            .timeout(self.timeout)
    }
}

#[derive(Serialize)]
struct CartesiaRequest<'a> {
    model_id: &'a str,
    transcript: &'a str,
    voice: VoiceSpec<'a>,
    output_format: OutputFormat,
}

#[derive(Serialize)]
struct VoiceSpec<'a> {
    mode: &'static str,
    id: &'a str,
}

#[derive(Serialize)]
struct OutputFormat {
    container: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding: Option<&'static str>,
    sample_rate: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    bit_rate: Option<u32>,
}

impl From<AudioFormat> for OutputFormat {
    fn from(format: AudioFormat) -> Self {
        let (container, encoding, bit_rate) = match format {
            AudioFormat::Mp3 => ("mp3", None, Some(128_000)),
            AudioFormat::Wav => ("wav", Some("pcm_s16le"), None),
            AudioFormat::Pcm => ("raw", Some("pcm_s16le"), None),
        };

        Self {
            container,
            encoding,
            sample_rate: SAMPLE_RATE,
            bit_rate,
        }
    }
}

/// Older API versions return a bare array, newer ones a paginated object
#[derive(Deserialize)]
#[serde(untagged)]
enum VoiceList {
    Bare(Vec<CartesiaVoice>),
    Paged { data: Vec<CartesiaVoice> },
}

#[derive(Deserialize)]
struct CartesiaVoice {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[async_trait]
impl TtsProvider for CartesiaProvider {
    async fn synthesize(&self, request: &Synthesis<'_>) -> Result<SpeechAudio> {
        let url = format!("{}/tts/bytes", self.base_url);
        let model = request.model.unwrap_or(&self.model);

        tracing::debug!(
            model,
            voice = request.voice,
            input_len = request.text.len(),
            "Cartesia TTS request"
        );

        let body = CartesiaRequest {
            model_id: model,
            transcript: request.text,
            voice: VoiceSpec {
                mode: "id",
                id: request.voice,
            },
            output_format: request.format.into(),
        };

        let response = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(NAME, &e))?;

        let response = check_status(NAME, response).await?;
        let content_type = content_type(&response, request.format);

        let audio = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Client(format!("failed to read Cartesia audio: {e}")))?;

        tracing::debug!(bytes = audio.len(), "Cartesia TTS synthesis complete");

        Ok(SpeechAudio {
            provider: NAME.to_string(),
            content_type,
            audio: audio.to_vec(),
        })
    }

    async fn voices(&self) -> Result<Vec<Voice>> {
        let url = format!("{}/voices", self.base_url);
        let url = url.as_str();

        let list: VoiceList = retry_with_backoff(RetryPolicy::default(), move || async move {
            let response = self
                .authorized(self.client.get(url))
                .send()
                .await
                .map_err(|e| send_error(NAME, &e))?;

            json_body(NAME, response).await
        })
        .await?;

        let voices = match list {
            VoiceList::Bare(voices) | VoiceList::Paged { data: voices } => voices,
        };

        Ok(voices
            .into_iter()
            .map(|voice| Voice {
                provider: NAME.to_string(),
                id: voice.id,
                name: voice.name,
                description: voice.description.filter(|d| !d.is_empty()),
            })
            .collect())
    }

    fn name(&self) -> &str {
        NAME
    }
}
