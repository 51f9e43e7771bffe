use base64::{Engine, engine::general_purpose::STANDARD};
use secrecy::SecretString;
use tollgate_config::{TtsConfig, TtsProviderConfig, TtsProviderKind};
use tollgate_core::{Result, ServiceError};

use crate::{
    provider::{Synthesis, TtsProvider, cartesia::CartesiaProvider, elevenlabs::ElevenLabsProvider},
    types::{EncodedSpeech, SpeechAudio, SynthesizeRequest, VoicesRequest, VoicesResponse},
};

pub(crate) const SERVICE: &str = "tts";

/// TTS service that routes requests to the configured providers
pub struct TtsService {
    providers: Vec<Box<dyn TtsProvider>>,
    default_provider: Option<String>,
}

impl TtsService {
    /// Synthesize text with the selected provider
    ///
    /// Selection order: the request's `provider`, the configured default,
    /// then the first configured provider.
    pub async fn synthesize(&self, request: &SynthesizeRequest) -> Result<SpeechAudio> {
        let provider = self.select(request.provider.as_deref())?;

        provider
            .synthesize(&Synthesis {
                text: &request.text,
                voice: &request.voice,
                model: request.model.as_deref(),
                format: request.format,
            })
            .await
    }

    /// Synthesize and base64-encode the audio for JSON callers
    pub async fn synthesize_encoded(&self, request: &SynthesizeRequest) -> Result<EncodedSpeech> {
        let speech = self.synthesize(request).await?;

        Ok(EncodedSpeech {
            bytes: speech.audio.len(),
            audio_base64: STANDARD.encode(&speech.audio),
            provider: speech.provider,
            content_type: speech.content_type,
        })
    }

    /// Voices of one provider, or of every provider when none is named
    pub async fn voices(&self, request: &VoicesRequest) -> Result<VoicesResponse> {
        let mut voices = Vec::new();

        match request.provider.as_deref() {
            Some(name) => voices.extend(self.find(name)?.voices().await?),
            None => {
                for provider in &self.providers {
                    voices.extend(provider.voices().await?);
                }
            }
        }

        Ok(VoicesResponse { voices })
    }

    /// Names of the configured providers
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    fn select(&self, requested: Option<&str>) -> Result<&dyn TtsProvider> {
        match requested.or(self.default_provider.as_deref()) {
            Some(name) => self.find(name),
            None => self
                .providers
                .first()
                .map(Box::as_ref)
                .ok_or_else(|| ServiceError::Config("no TTS providers configured".to_string())),
        }
    }

    fn find(&self, name: &str) -> Result<&dyn TtsProvider> {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .map(Box::as_ref)
            .ok_or_else(|| ServiceError::Config(format!("TTS provider '{name}' is not configured")))
    }
}

/// Builder for constructing the TTS service from configuration
pub struct TtsServiceBuilder<'a> {
    config: &'a TtsConfig,
}

impl<'a> TtsServiceBuilder<'a> {
    pub const fn new(config: &'a TtsConfig) -> Self {
        Self { config }
    }

    pub fn build(self) -> Result<TtsService> {
        let timeout = self.config.timeout();
        let mut providers: Vec<Box<dyn TtsProvider>> = Vec::new();

        for (kind, provider_config) in self.config.providers() {
            tracing::debug!(provider = kind.as_str(), "initializing TTS provider");

            let api_key = resolve_api_key(kind, provider_config)?;
            let base_url = provider_config.base_url.as_ref().map(url::Url::as_str);
            let model = provider_config.model.as_deref();

            let provider: Box<dyn TtsProvider> = match kind {
                TtsProviderKind::Elevenlabs => Box::new(ElevenLabsProvider::new(api_key, base_url, model, timeout)),
                TtsProviderKind::Cartesia => Box::new(CartesiaProvider::new(api_key, base_url, model, timeout)),
            };

            providers.push(provider);
        }

        if providers.is_empty() {
            return Err(ServiceError::Config("no TTS providers configured".to_string()));
        }

        let default_provider = self.config.default_provider.map(|kind| kind.as_str().to_string());

        if let Some(name) = &default_provider
            && !providers.iter().any(|p| p.name() == name)
        {
            return Err(ServiceError::Config(format!(
                "default TTS provider '{name}' is not configured"
            )));
        }

        tracing::debug!(providers = providers.len(), "TTS service initialized");

        Ok(TtsService {
            providers,
            default_provider,
        })
    }
}

fn resolve_api_key(kind: TtsProviderKind, config: &TtsProviderConfig) -> Result<SecretString> {
    config
        .api_key
        .clone()
        .ok_or_else(|| ServiceError::Config(format!("API key required for TTS provider '{}'", kind.as_str())))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    use super::*;
    use crate::types::AudioFormat;

    fn service(toml: &str) -> Result<TtsService> {
        let config: TtsConfig = toml::from_str(toml).unwrap();
        TtsServiceBuilder::new(&config).build()
    }

    fn request(provider: Option<&str>) -> SynthesizeRequest {
        SynthesizeRequest {
            text: "hi".into(),
            voice: "v".into(),
            provider: provider.map(str::to_string),
            model: None,
            format: AudioFormat::Mp3,
        }
    }

    #[test]
    fn provider_without_key_fails() {
        assert!(matches!(service("[elevenlabs]\n"), Err(ServiceError::Config(_))));
    }

    #[test]
    fn no_providers_fails() {
        assert!(matches!(service(""), Err(ServiceError::Config(_))));
    }

    #[test]
    fn unconfigured_default_fails() {
        let err = service("default_provider = \"cartesia\"\n[elevenlabs]\napi_key = \"k\"\n")
            .err()
            .unwrap();
        assert!(err.to_string().contains("cartesia"));
    }

    #[tokio::test]
    async fn unknown_provider_is_named() {
        let service = service("[elevenlabs]\napi_key = \"k\"\n").unwrap();
        let err = service.synthesize(&request(Some("polly"))).await.unwrap_err();
        assert!(matches!(err, ServiceError::Config(ref message) if message.contains("polly")));
    }

    #[tokio::test]
    async fn default_provider_wins_over_declaration_order() {
        let elevenlabs = MockServer::start().await;
        let cartesia = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2]))
            .expect(0)
            .mount(&elevenlabs)
            .await;
        Mock::given(method("POST"))
            .and(path("/tts/bytes"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2, 3]))
            .expect(1)
            .mount(&cartesia)
            .await;

        let service = service(&format!(
            "default_provider = \"cartesia\"\n\
             [elevenlabs]\napi_key = \"a\"\nbase_url = \"{}\"\n\
             [cartesia]\napi_key = \"b\"\nbase_url = \"{}\"\n",
            elevenlabs.uri(),
            cartesia.uri()
        ))
        .unwrap();

        let encoded = service.synthesize_encoded(&request(None)).await.unwrap();

        assert_eq!(encoded.provider, "cartesia");
        assert_eq!(encoded.bytes, 3);
        assert_eq!(encoded.audio_base64, "AQID");
    }

    #[tokio::test]
    async fn voices_from_every_provider() {
        let elevenlabs = MockServer::start().await;
        let cartesia = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/voices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "voices": [{"voice_id": "e1", "name": "Adam"}]
            })))
            .mount(&elevenlabs)
            .await;
        Mock::given(method("GET"))
            .and(path("/voices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "c1", "name": "Sarah", "description": "Warm"}
            ])))
            .mount(&cartesia)
            .await;

        let service = service(&format!(
            "[elevenlabs]\napi_key = \"a\"\nbase_url = \"{}\"\n[cartesia]\napi_key = \"b\"\nbase_url = \"{}\"\n",
            elevenlabs.uri(),
            cartesia.uri()
        ))
        .unwrap();

        let all = service.voices(&VoicesRequest::default()).await.unwrap();
        let ids: Vec<&str> = all.voices.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "c1"]);

        let one = service
            .voices(&VoicesRequest {
                provider: Some("cartesia".into()),
            })
            .await
            .unwrap();
        assert_eq!(one.voices.len(), 1);
        assert_eq!(one.voices[0].description.as_deref(), Some("Warm"));
    }
}
