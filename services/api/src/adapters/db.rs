//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Summaries and comparison results are stored as JSONB. Chat messages live in
//! their own table so that appending one is a single `INSERT`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use report_assistant_core::analysis::{ComparisonSummary, ReportSummary};
use report_assistant_core::domain::{
    ChatSession, Comparison, ComparisonKey, Message, NewChatSession, NewComparison, NewReport,
    Report, ReportBinding, ReportKey, Role,
};
use report_assistant_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn messages_for(&self, session_ids: &[Uuid]) -> PortResult<HashMap<Uuid, Vec<Message>>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            "SELECT session_id, role, content, created_at FROM chat_messages
             WHERE session_id = ANY($1) ORDER BY seq ASC",
        )
        .bind(session_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut by_session: HashMap<Uuid, Vec<Message>> = HashMap::new();
        for record in records {
            let session_id = record.session_id;
            by_session
                .entry(session_id)
                .or_default()
                .push(record.to_domain()?);
        }
        Ok(by_session)
    }

    async fn with_messages(&self, records: Vec<SessionRecord>) -> PortResult<Vec<ChatSession>> {
        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let mut messages = self.messages_for(&ids).await?;
        records
            .into_iter()
            .map(|r| {
                let history = messages.remove(&r.id).unwrap_or_default();
                r.to_domain(history)
            })
            .collect()
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ReportRecord {
    id: Uuid,
    user_id: String,
    report_name: String,
    report_type: String,
    sanitized_text: String,
    summary: Json<ReportSummary>,
    language: String,
    created_at: DateTime<Utc>,
}
impl ReportRecord {
    fn to_domain(self) -> PortResult<Report> {
        Ok(Report {
            id: self.id,
            user_id: self.user_id,
            key: ReportKey::new(&self.report_name, &self.report_type)?,
            sanitized_text: self.sanitized_text,
            summary: self.summary.0,
            language: self.language,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    user_id: String,
    report_id: Option<Uuid>,
    report_name: String,
    report_type: String,
    language: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl SessionRecord {
    fn to_domain(self, messages: Vec<Message>) -> PortResult<ChatSession> {
        Ok(ChatSession {
            id: self.id,
            user_id: self.user_id,
            report: ReportBinding::from(self.report_id),
            report_key: ReportKey::new(&self.report_name, &self.report_type)?,
            language: self.language,
            messages,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct MessageRecord {
    session_id: Uuid,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}
impl MessageRecord {
    fn to_domain(self) -> PortResult<Message> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| PortError::Unexpected(format!("unknown message role '{}'", self.role)))?;
        Ok(Message {
            role,
            content: self.content,
            timestamp: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ComparisonRecord {
    id: Uuid,
    user_id: String,
    old_name: String,
    old_type: String,
    new_name: String,
    new_type: String,
    result: Json<ComparisonSummary>,
    created_at: DateTime<Utc>,
}
impl ComparisonRecord {
    fn to_domain(self) -> PortResult<Comparison> {
        Ok(Comparison {
            id: self.id,
            user_id: self.user_id,
            key: ComparisonKey {
                old: ReportKey::new(&self.old_name, &self.old_type)?,
                new: ReportKey::new(&self.new_name, &self.new_type)?,
            },
            result: self.result.0,
            created_at: self.created_at,
        })
    }
}

const REPORT_COLUMNS: &str =
    "id, user_id, report_name, report_type, sanitized_text, summary, language, created_at";
const SESSION_COLUMNS: &str =
    "id, user_id, report_id, report_name, report_type, language, created_at, updated_at";
const COMPARISON_COLUMNS: &str =
    "id, user_id, old_name, old_type, new_name, new_type, result, created_at";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_report(&self, report: NewReport) -> PortResult<Report> {
        let record = sqlx::query_as::<_, ReportRecord>(&format!(
            "INSERT INTO reports (id, user_id, report_name, report_type, sanitized_text, summary, language)
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {REPORT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&report.user_id)
        .bind(report.key.name())
        .bind(report.key.report_type())
        .bind(&report.sanitized_text)
        .bind(Json(&report.summary))
        .bind(&report.language)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn find_report(&self, user_id: &str, key: &ReportKey) -> PortResult<Option<Report>> {
        let record = sqlx::query_as::<_, ReportRecord>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports
             WHERE user_id = $1 AND report_name = $2 AND report_type = $3
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(user_id)
        .bind(key.name())
        .bind(key.report_type())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(ReportRecord::to_domain).transpose()
    }

    async fn list_reports(&self, user_id: &str) -> PortResult<Vec<Report>> {
        let records = sqlx::query_as::<_, ReportRecord>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(ReportRecord::to_domain).collect()
    }

    async fn create_chat_session(&self, session: NewChatSession) -> PortResult<ChatSession> {
        let record = sqlx::query_as::<_, SessionRecord>(&format!(
            "INSERT INTO chat_sessions (id, user_id, report_id, report_name, report_type, language)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {SESSION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&session.user_id)
        .bind(session.report.report_id())
        .bind(session.report_key.name())
        .bind(session.report_key.report_type())
        .bind(&session.language)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain(Vec::new())
    }

    async fn get_chat_session(&self, session_id: Uuid) -> PortResult<Option<ChatSession>> {
        let record = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match record {
            Some(record) => Ok(self.with_messages(vec![record]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_chat_session_for_report(
        &self,
        user_id: &str,
        report_id: Uuid,
    ) -> PortResult<Option<ChatSession>> {
        let record = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions
             WHERE user_id = $1 AND report_id = $2
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(user_id)
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match record {
            Some(record) => Ok(self.with_messages(vec![record]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_chat_sessions(&self, user_id: &str) -> PortResult<Vec<ChatSession>> {
        let records = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        self.with_messages(records).await
    }

    async fn bind_chat_session_report(
        &self,
        session_id: Uuid,
        report_id: Uuid,
    ) -> PortResult<bool> {
        // Conditional on report_id IS NULL so concurrent binds upgrade only once.
        let result = sqlx::query(
            "UPDATE chat_sessions SET report_id = $2, updated_at = now()
             WHERE id = $1 AND report_id IS NULL",
        )
        .bind(session_id)
        .bind(report_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM chat_sessions WHERE id = $1)")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        if exists {
            Ok(false)
        } else {
            Err(PortError::NotFound(format!("Session {} not found", session_id)))
        }
    }

    async fn append_chat_message(&self, session_id: Uuid, message: &Message) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let touched = sqlx::query("UPDATE chat_sessions SET updated_at = now() WHERE id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        if touched.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Session {} not found", session_id)));
        }

        sqlx::query(
            "INSERT INTO chat_messages (session_id, role, content, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(session_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.timestamp)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn save_comparison(&self, comparison: NewComparison) -> PortResult<Comparison> {
        let record = sqlx::query_as::<_, ComparisonRecord>(&format!(
            "INSERT INTO comparisons (id, user_id, old_name, old_type, new_name, new_type, result)
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {COMPARISON_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&comparison.user_id)
        .bind(comparison.key.old.name())
        .bind(comparison.key.old.report_type())
        .bind(comparison.key.new.name())
        .bind(comparison.key.new.report_type())
        .bind(Json(&comparison.result))
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn find_comparison(
        &self,
        user_id: &str,
        key: &ComparisonKey,
    ) -> PortResult<Option<Comparison>> {
        let record = sqlx::query_as::<_, ComparisonRecord>(&format!(
            "SELECT {COMPARISON_COLUMNS} FROM comparisons
             WHERE user_id = $1 AND old_name = $2 AND old_type = $3 AND new_name = $4 AND new_type = $5
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(user_id)
        .bind(key.old.name())
        .bind(key.old.report_type())
        .bind(key.new.name())
        .bind(key.new.report_type())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(ComparisonRecord::to_domain).transpose()
    }
}
