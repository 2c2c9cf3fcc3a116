//! services/api/src/adapters/sst.rs
//!
//! This module contains the adapter for OpenAI's Speech-to-Text (Whisper) service.
//! It implements the `SpeechToTextService` port from the `core` crate.
//!
//! Audio arrives already encoded by the client (webm, wav, mp3, ...); the
//! provider detects the container from the upload, so no transcoding happens here.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::audio::{AudioInput, CreateTranscriptionRequest},
    Client,
};
use async_trait::async_trait;
use report_assistant_core::ports::{PortError, PortResult, SpeechToTextService};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `SpeechToTextService` port using the OpenAI Whisper API.
#[derive(Clone)]
pub struct OpenAiSstAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiSstAdapter {
    /// Creates a new `OpenAiSstAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    /// The file name sent with the upload; the extension is only a hint to the provider.
    fn upload_name(audio_data: &[u8]) -> &'static str {
        if audio_data.starts_with(b"RIFF") {
            "voice_message.wav"
        } else if audio_data.starts_with(b"ID3") {
            "voice_message.mp3"
        } else if audio_data.starts_with(b"OggS") {
            "voice_message.ogg"
        } else {
            "voice_message.webm"
        }
    }
}

//=========================================================================================
// `SpeechToTextService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SpeechToTextService for OpenAiSstAdapter {
    /// Transcribes a slice of audio data into text using the configured Whisper model.
    async fn transcribe_audio(&self, audio_data: &[u8], language: &str) -> PortResult<String> {
        if audio_data.is_empty() {
            return Err(PortError::Validation("audio is empty".to_string()));
        }

        let input = AudioInput::from_vec_u8(Self::upload_name(audio_data).into(), audio_data.to_vec());

        let request = CreateTranscriptionRequest {
            file: input,
            model: self.model.clone(),
            language: Some(language.to_string()),
            ..Default::default()
        };

        // Call the API and manually map the error, which respects the orphan rule.
        let response = self
            .client
            .audio()
            .transcription()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        Ok(response.text.trim().to_string())
    }
}
