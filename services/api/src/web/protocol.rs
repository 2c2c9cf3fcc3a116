//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged with the browser client. Field names
//! are camelCase on the wire. Analysis results are passed through as opaque
//! JSON objects in the OpenAPI document.

use chrono::{DateTime, Utc};
use report_assistant_core::domain::{ChatSession, Comparison, Message, Report, SessionState};
use report_assistant_core::{ChatReply, ComparisonOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Reports
//=========================================================================================

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: Uuid,
    pub report_name: String,
    pub report_type: String,
    pub language: String,
    /// `{"mode": "structured" | "text", "content": ...}`
    #[schema(value_type = Object)]
    pub summary: Value,
    pub created_at: DateTime<Utc>,
}

impl From<Report> for ReportResponse {
    fn from(report: Report) -> Self {
        Self {
            id: report.id,
            report_name: report.key.name().to_string(),
            report_type: report.key.report_type().to_string(),
            language: report.language,
            summary: serde_json::to_value(&report.summary).unwrap_or(Value::Null),
            created_at: report.created_at,
        }
    }
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    pub name: String,
    #[serde(rename = "type")]
    pub report_type: String,
}

//=========================================================================================
// Chat
//=========================================================================================

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub report_name: String,
    pub report_type: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    /// `user` or `assistant`.
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&Message> for MessageDto {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
            timestamp: message.timestamp,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: Uuid,
    /// Absent while the report is still pending.
    pub report_id: Option<Uuid>,
    pub report_name: String,
    pub report_type: String,
    pub language: String,
    /// `created`, `active` or `resolved`.
    pub state: String,
    pub messages: Vec<MessageDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn state_name(state: SessionState) -> &'static str {
    match state {
        SessionState::Created => "created",
        SessionState::Active => "active",
        SessionState::Resolved => "resolved",
    }
}

impl From<ChatSession> for SessionResponse {
    fn from(session: ChatSession) -> Self {
        Self {
            session_id: session.id,
            report_id: session.report.report_id(),
            report_name: session.report_key.name().to_string(),
            report_type: session.report_key.report_type().to_string(),
            language: session.language.clone(),
            state: state_name(session.state()).to_string(),
            messages: session.messages.iter().map(MessageDto::from).collect(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub session_id: Uuid,
    pub message: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatReplyResponse {
    pub session_id: Uuid,
    pub report_id: Option<Uuid>,
    pub response: String,
}

impl From<ChatReply> for ChatReplyResponse {
    fn from(reply: ChatReply) -> Self {
        Self {
            session_id: reply.session_id,
            report_id: reply.report.report_id(),
            response: reply.response,
        }
    }
}

//=========================================================================================
// Comparisons
//=========================================================================================

/// The JSON form of a comparison request. The multipart form uses the same
/// field names plus a `file` part holding the newer report.
#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequestBody {
    pub old_report_name: String,
    pub old_report_type: String,
    #[serde(default)]
    pub new_report_name: Option<String>,
    #[serde(default)]
    pub new_report_type: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Deserialize, Debug, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ComparisonQuery {
    pub old: String,
    pub old_type: String,
    pub new: String,
    pub new_type: String,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResponse {
    pub id: Uuid,
    /// True when served from the comparison cache.
    pub cached: bool,
    pub old_report_name: String,
    pub old_report_type: String,
    pub new_report_name: String,
    pub new_report_type: String,
    #[schema(value_type = Object)]
    pub result: Value,
    pub created_at: DateTime<Utc>,
}

impl ComparisonResponse {
    pub fn new(comparison: Comparison, cached: bool) -> Self {
        Self {
            id: comparison.id,
            cached,
            old_report_name: comparison.key.old.name().to_string(),
            old_report_type: comparison.key.old.report_type().to_string(),
            new_report_name: comparison.key.new.name().to_string(),
            new_report_type: comparison.key.new.report_type().to_string(),
            result: serde_json::to_value(&comparison.result).unwrap_or(Value::Null),
            created_at: comparison.created_at,
        }
    }
}

impl From<ComparisonOutcome> for ComparisonResponse {
    fn from(outcome: ComparisonOutcome) -> Self {
        Self::new(outcome.comparison, outcome.cached)
    }
}

//=========================================================================================
// Voice
//=========================================================================================

#[derive(Serialize, Debug, ToSchema)]
pub struct LanguageDto {
    pub code: String,
    pub name: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct LanguagesResponse {
    pub languages: Vec<LanguageDto>,
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpeechToTextRequest {
    /// Base64-encoded audio.
    pub audio: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct SpeechToTextResponse {
    pub text: String,
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextToSpeechRequest {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct TextToSpeechResponse {
    /// Base64-encoded audio.
    pub audio: String,
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoiceMessageRequest {
    pub session_id: Uuid,
    /// Base64-encoded audio of the spoken question.
    pub audio: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoiceMessageResponse {
    pub session_id: Uuid,
    pub transcript: String,
    pub response: String,
    /// Base64-encoded audio of the answer.
    pub audio: String,
}
