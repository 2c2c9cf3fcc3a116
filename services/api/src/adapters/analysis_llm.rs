//! services/api/src/adapters/analysis_llm.rs
//!
//! This module contains the adapter for the analysis LLM.
//! It implements the `AnalysisEngine` port from the `core` crate against any
//! OpenAI-compatible chat completions endpoint (OpenAI itself, or Gemini's
//! OpenAI-compatible base URL).

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat as ChatResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use report_assistant_core::ports::{AnalysisEngine, PortError, PortResult, Prompt, ResponseFormat};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AnalysisEngine` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAnalysisAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiAnalysisAdapter {
    /// Creates a new `OpenAiAnalysisAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String, temperature: f32) -> Self {
        Self {
            client,
            model,
            temperature,
        }
    }
}

//=========================================================================================
// `AnalysisEngine` Trait Implementation
//=========================================================================================

#[async_trait]
impl AnalysisEngine for OpenAiAnalysisAdapter {
    /// Sends the rendered prompt as a system + user message pair and returns the raw reply.
    async fn analyze(&self, prompt: &Prompt) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(prompt.instructions.as_str())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.input.as_str())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .n(1);
        if prompt.format == ResponseFormat::Json {
            builder.response_format(ChatResponseFormat::JsonObject);
        }
        let request = builder
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        debug!(model = %self.model, usage = ?response.usage, "Analysis engine replied");

        // Extract the text content from the first choice in the response.
        match response.choices.into_iter().next() {
            Some(choice) => choice.message.content.ok_or_else(|| {
                PortError::MalformedAnalysis("the engine reply contained no text content".to_string())
            }),
            None => Err(PortError::MalformedAnalysis(
                "the engine returned no choices".to_string(),
            )),
        }
    }
}
