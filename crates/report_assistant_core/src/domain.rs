//! crates/report_assistant_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! Storage adapters map their own record types onto these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::{ComparisonSummary, ReportSummary};
use crate::ports::{PortError, PortResult};

//=========================================================================================
// Report Identity
//=========================================================================================

/// The normalized `(name, type)` pair that identifies a report for one user.
///
/// Names are trimmed and lower-cased, types are trimmed and upper-cased. The
/// fields are private so every key in the system went through [`ReportKey::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawReportKey")]
pub struct ReportKey {
    name: String,
    report_type: String,
}

#[derive(Deserialize)]
struct RawReportKey {
    name: String,
    report_type: String,
}

impl TryFrom<RawReportKey> for ReportKey {
    type Error = PortError;

    fn try_from(raw: RawReportKey) -> PortResult<Self> {
        ReportKey::new(&raw.name, &raw.report_type)
    }
}

impl ReportKey {
    /// Normalizes and validates a report name and type.
    pub fn new(name: &str, report_type: &str) -> PortResult<Self> {
        let name = name.trim().to_lowercase();
        let report_type = report_type.trim().to_uppercase();

        if name.is_empty() {
            return Err(PortError::Validation("reportName is required".to_string()));
        }
        if report_type.is_empty() {
            return Err(PortError::Validation("reportType is required".to_string()));
        }

        Ok(Self { name, report_type })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn report_type(&self) -> &str {
        &self.report_type
    }
}

impl std::fmt::Display for ReportKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.report_type)
    }
}

//=========================================================================================
// Reports
//=========================================================================================

/// A de-identified medical report together with its derived analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub user_id: String,
    pub key: ReportKey,
    pub sanitized_text: String,
    pub summary: ReportSummary,
    pub language: String,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to persist a report; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub user_id: String,
    pub key: ReportKey,
    pub sanitized_text: String,
    pub summary: ReportSummary,
    pub language: String,
}

/// A raw document as received from the caller.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

//=========================================================================================
// Chat Sessions
//=========================================================================================

/// Whether a chat session has been tied to a concrete report yet.
///
/// A session can be opened before the report it refers to is visible to
/// queries; it stays `Pending` until a later lookup succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reportId", rename_all = "snake_case")]
pub enum ReportBinding {
    Pending,
    Resolved(Uuid),
}

impl ReportBinding {
    pub fn report_id(&self) -> Option<Uuid> {
        match self {
            ReportBinding::Pending => None,
            ReportBinding::Resolved(id) => Some(*id),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ReportBinding::Pending)
    }
}

impl From<Option<Uuid>> for ReportBinding {
    fn from(report_id: Option<Uuid>) -> Self {
        report_id.map_or(ReportBinding::Pending, ReportBinding::Resolved)
    }
}

/// Lifecycle of a chat session, derived from its binding and history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No messages exchanged yet.
    Created,
    /// Messages exchanged while the report is still pending.
    Active,
    /// Messages exchanged against a concrete report.
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: String,
    pub report: ReportBinding,
    pub report_key: ReportKey,
    pub language: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn state(&self) -> SessionState {
        match (self.messages.is_empty(), self.report) {
            (true, _) => SessionState::Created,
            (false, ReportBinding::Pending) => SessionState::Active,
            (false, ReportBinding::Resolved(_)) => SessionState::Resolved,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

#[derive(Debug, Clone)]
pub struct NewChatSession {
    pub user_id: String,
    pub report: ReportBinding,
    pub report_key: ReportKey,
    pub language: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// A single chat turn. Messages are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

//=========================================================================================
// Comparisons
//=========================================================================================

/// The cache key of a comparison: both report keys, normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComparisonKey {
    pub old: ReportKey,
    pub new: ReportKey,
}

/// A stored comparison between two of a user's reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub id: Uuid,
    pub user_id: String,
    pub key: ComparisonKey,
    pub result: ComparisonSummary,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComparison {
    pub user_id: String,
    pub key: ComparisonKey,
    pub result: ComparisonSummary,
}
