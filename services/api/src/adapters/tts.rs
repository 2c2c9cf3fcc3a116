//! services/api/src/adapters/tts.rs
//!
//! This module contains the adapter for OpenAI's Text-to-Speech (TTS) service.
//! It implements the `TextToSpeechService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::audio::{CreateSpeechRequest, SpeechModel, Voice},
    Client,
};
use async_trait::async_trait;
use report_assistant_core::ports::{PortError, PortResult, TextToSpeechService};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `TextToSpeechService` port using the OpenAI TTS API.
#[derive(Clone)]
pub struct OpenAiTtsAdapter {
    client: Client<OpenAIConfig>,
    model: SpeechModel,
    voice: Voice,
}

impl OpenAiTtsAdapter {
    /// Creates a new `OpenAiTtsAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: SpeechModel, voice: Voice) -> Self {
        Self {
            client,
            model,
            voice,
        }
    }

    /// Maps a configured voice name onto the provider's voice list.
    pub fn parse_voice(name: &str) -> Option<Voice> {
        match name.trim().to_lowercase().as_str() {
            "alloy" => Some(Voice::Alloy),
            "echo" => Some(Voice::Echo),
            "fable" => Some(Voice::Fable),
            "onyx" => Some(Voice::Onyx),
            "nova" => Some(Voice::Nova),
            "shimmer" => Some(Voice::Shimmer),
            _ => None,
        }
    }

    /// Maps a configured model name onto the provider's speech models.
    pub fn parse_model(name: &str) -> SpeechModel {
        match name.trim().to_lowercase().as_str() {
            "tts-1" => SpeechModel::Tts1,
            "tts-1-hd" => SpeechModel::Tts1Hd,
            other => SpeechModel::Other(other.to_string()),
        }
    }
}

//=========================================================================================
// `TextToSpeechService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextToSpeechService for OpenAiTtsAdapter {
    /// Generates audio for the text. The voices are multilingual, so the language
    /// only shows up in the logs.
    async fn generate_audio(&self, text: &str, language: &str) -> PortResult<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(PortError::Validation("text is required".to_string()));
        }

        let request = CreateSpeechRequest {
            model: self.model.clone(),
            input: text.to_string(),
            voice: self.voice.clone(),
            ..Default::default()
        };

        // Call the API and manually map the error, which respects the orphan rule.
        let response = self
            .client
            .audio()
            .speech()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        debug!(language, bytes = response.bytes.len(), "Generated speech");
        Ok(response.bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voices_and_models_parse_case_insensitively() {
        assert!(matches!(OpenAiTtsAdapter::parse_voice(" Nova "), Some(Voice::Nova)));
        assert!(OpenAiTtsAdapter::parse_voice("robot").is_none());
        assert!(matches!(OpenAiTtsAdapter::parse_model("TTS-1-HD"), SpeechModel::Tts1Hd));
    }
}
