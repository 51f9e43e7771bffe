use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tollgate_core::{Result, RetryPolicy, ServiceError, check_status, json_body, retry_with_backoff, send_error};

use super::{Synthesis, TtsProvider, content_type};
use crate::types::{AudioFormat, SpeechAudio, Voice};

pub(crate) const NAME: &str = "elevenlabs";

const DEFAULT_API_URL: &str = "https://api.elevenlabs.io";
const DEFAULT_MODEL: &str = "eleven_multilingual_v2";

/// `ElevenLabs` TTS provider
pub struct ElevenLabsProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    timeout: Duration,
}

impl ElevenLabsProvider {
    pub fn new(api_key: SecretString, base_url: Option<&str>, model: Option<&str>, timeout: Duration) -> Self {
        Self {
            client: tollgate_core::http_client(),
            base_url: base_url.unwrap_or(DEFAULT_API_URL).trim_end_matches('/').to_string(),
            api_key,
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            timeout,
        }
    }
}

#[derive(Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

#[derive(Deserialize)]
struct VoiceList {
    #[serde(default)]
    voices: Vec<ElevenLabsVoice>,
}

#[derive(Deserialize)]
struct ElevenLabsVoice {
    voice_id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
}

const fn output_format(format: AudioFormat) -> &'static str {
    match format {
        AudioFormat::Mp3 => "mp3_44100_128",
        AudioFormat::Wav => "wav_44100",
        AudioFormat::Pcm => "pcm_44100",
    }
}

#[async_trait]
impl TtsProvider for ElevenLabsProvider {
    async fn synthesize(&self, request: &Synthesis<'_>) -> Result<SpeechAudio> {
        let mut url = reqwest::Url::parse(&format!("{}/v1/text-to-speech/", self.base_url))
            .map_err(|e| ServiceError::Config(format!("invalid ElevenLabs base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ServiceError::Config("invalid ElevenLabs base URL".to_string()))?
            .pop_if_empty()
            .push(request.voice);
        url.query_pairs_mut()
            .append_pair("output_format", output_format(request.format));

        let model = request.model.unwrap_or(&self.model);

        tracing::debug!(
            model,
            voice = request.voice,
            input_len = request.text.len(),
            "ElevenLabs TTS request"
        );

        let response = self
            .client
            .post(url)
            .header("xi-api-key", self.api_key.expose_secret())
            .timeout(self.timeout)
            .json(&ElevenLabsRequest {
                text: request.text,
                model_id: model,
            })
            .send()
            .await
            .map_err(|e| send_error(NAME, &e))?;

        let response = check_status(NAME, response).await?;
        let content_type = content_type(&response, request.format);

        let audio = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Client(format!("failed to read ElevenLabs audio: {e}")))?;

        tracing::debug!(bytes = audio.len(), "ElevenLabs TTS synthesis complete");

        Ok(SpeechAudio {
            provider: NAME.to_string(),
            content_type,
            audio: audio.to_vec(),
        })
    }

    async fn voices(&self) -> Result<Vec<Voice>> {
        let url = format!("{}/v1/voices", self.base_url);
        let url = url.as_str();

        let list: VoiceList = retry_with_backoff(RetryPolicy::default(), move || async move {
            let response = self
                .client
                .get(url)
                .header("xi-api-key", self.api_key.expose_secret())
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| send_error(NAME, &e))?;

            json_body(NAME, response).await
        })
        .await?;

        Ok(list
            .voices
            .into_iter()
            .map(|voice| Voice {
                provider: NAME.to_string(),
                id: voice.voice_id,
                name: voice.name,
                description: voice.description,
            })
            .collect())
    }

    fn name(&self) -> &str {
        NAME
    }
}
