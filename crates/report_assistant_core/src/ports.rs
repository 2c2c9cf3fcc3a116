//! crates/report_assistant_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    ChatSession, Comparison, ComparisonKey, Message, NewChatSession, NewComparison, NewReport,
    Report, ReportKey,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port and core operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// A record is absent or belongs to another user.
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A chat session's report could not be resolved.
    #[error("Report not found: {0}")]
    ReportNotFound(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    /// Extraction produced no text at all.
    #[error("The document contains no readable text")]
    EmptyDocument,
    /// The analysis engine returned output that violates its response contract.
    #[error("Malformed analysis response: {0}")]
    MalformedAnalysis(String),
    /// Ingestion failed; the cause has already been logged.
    #[error("Failed to process report")]
    Processing,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Port
//=========================================================================================

/// The record store. Point lookups may lag behind writes; see `ReportResolver`.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Reports ---
    async fn create_report(&self, report: NewReport) -> PortResult<Report>;

    /// Exact-match lookup on `(user_id, key)`; returns the newest match.
    async fn find_report(&self, user_id: &str, key: &ReportKey) -> PortResult<Option<Report>>;

    async fn list_reports(&self, user_id: &str) -> PortResult<Vec<Report>>;

    // --- Chat Sessions ---
    async fn create_chat_session(&self, session: NewChatSession) -> PortResult<ChatSession>;

    /// Fetches a session by id with its messages. Ownership is checked by the caller.
    async fn get_chat_session(&self, session_id: Uuid) -> PortResult<Option<ChatSession>>;

    /// The most recent session of `user_id` bound to `report_id`.
    async fn find_chat_session_for_report(
        &self,
        user_id: &str,
        report_id: Uuid,
    ) -> PortResult<Option<ChatSession>>;

    async fn list_chat_sessions(&self, user_id: &str) -> PortResult<Vec<ChatSession>>;

    /// Binds a pending session to a report. Returns `false` if it was already bound.
    async fn bind_chat_session_report(&self, session_id: Uuid, report_id: Uuid)
        -> PortResult<bool>;

    /// Atomically appends one message to a session's history.
    async fn append_chat_message(&self, session_id: Uuid, message: &Message) -> PortResult<()>;

    // --- Comparisons ---
    async fn save_comparison(&self, comparison: NewComparison) -> PortResult<Comparison>;

    async fn find_comparison(
        &self,
        user_id: &str,
        key: &ComparisonKey,
    ) -> PortResult<Option<Comparison>>;
}

//=========================================================================================
// Analysis Engine Port
//=========================================================================================

/// The output format requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Text,
}

/// A fully rendered request for the analysis engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub instructions: String,
    pub input: String,
    pub format: ResponseFormat,
}

#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    /// Submits a prompt and returns the raw text of the engine's reply.
    async fn analyze(&self, prompt: &Prompt) -> PortResult<String>;
}

//=========================================================================================
// Document Extraction Port
//=========================================================================================

pub trait DocumentExtractor: Send + Sync {
    /// Extracts the text of every page (or section), in document order.
    fn extract_pages(&self, document: &[u8]) -> PortResult<Vec<String>>;

    /// Extracts the whole document as one string.
    ///
    /// Fails with [`PortError::EmptyDocument`] when nothing but whitespace came out.
    fn extract(&self, document: &[u8]) -> PortResult<String> {
        let text = self.extract_pages(document)?.join("\n");
        if text.trim().is_empty() {
            return Err(PortError::EmptyDocument);
        }
        Ok(text)
    }
}

//=========================================================================================
// Speech Ports
//=========================================================================================

#[async_trait]
pub trait SpeechToTextService: Send + Sync {
    /// Transcribes encoded audio into text.
    async fn transcribe_audio(&self, audio_data: &[u8], language: &str) -> PortResult<String>;
}

#[async_trait]
pub trait TextToSpeechService: Send + Sync {
    /// Generates encoded audio from a string of text.
    async fn generate_audio(&self, text: &str, language: &str) -> PortResult<Vec<u8>>;
}
