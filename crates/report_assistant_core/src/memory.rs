//! crates/report_assistant_core/src/memory.rs
//!
//! An in-process implementation of `DatabaseService`, used for local runs
//! without PostgreSQL and as the store in tests.
//!
//! It can simulate the store's propagation delay: with a visibility lag of
//! `n`, the first `n` point lookups that would match a newly written report
//! miss it.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::{
    ChatSession, Comparison, ComparisonKey, Message, NewChatSession, NewComparison, NewReport,
    Report, ReportBinding, ReportKey,
};
use crate::ports::{DatabaseService, PortError, PortResult};

struct StoredReport {
    report: Report,
    hidden_lookups: usize,
}

#[derive(Default)]
struct Tables {
    reports: Vec<StoredReport>,
    sessions: HashMap<Uuid, ChatSession>,
    comparisons: Vec<Comparison>,
}

#[derive(Default)]
pub struct InMemoryDatabase {
    tables: Mutex<Tables>,
    visibility_lag: usize,
    report_lookups: AtomicUsize,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose point lookups miss each new report `lag` times before seeing it.
    pub fn with_visibility_lag(lag: usize) -> Self {
        Self {
            visibility_lag: lag,
            ..Self::default()
        }
    }

    /// Number of `find_report` calls served so far.
    pub fn report_lookups(&self) -> usize {
        self.report_lookups.load(Ordering::SeqCst)
    }

    fn tables(&self) -> PortResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| PortError::Unexpected("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn create_report(&self, report: NewReport) -> PortResult<Report> {
        let report = Report {
            id: Uuid::new_v4(),
            user_id: report.user_id,
            key: report.key,
            sanitized_text: report.sanitized_text,
            summary: report.summary,
            language: report.language,
            created_at: Utc::now(),
        };
        self.tables()?.reports.push(StoredReport {
            report: report.clone(),
            hidden_lookups: self.visibility_lag,
        });
        Ok(report)
    }

    async fn find_report(&self, user_id: &str, key: &ReportKey) -> PortResult<Option<Report>> {
        self.report_lookups.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables()?;

        let mut newest: Option<Report> = None;
        for stored in tables
            .reports
            .iter_mut()
            .filter(|s| s.report.user_id == user_id && &s.report.key == key)
        {
            if stored.hidden_lookups > 0 {
                stored.hidden_lookups -= 1;
                continue;
            }
            // Later insertions win ties on the timestamp.
            if newest
                .as_ref()
                .map_or(true, |n| stored.report.created_at >= n.created_at)
            {
                newest = Some(stored.report.clone());
            }
        }
        Ok(newest)
    }

    async fn list_reports(&self, user_id: &str) -> PortResult<Vec<Report>> {
        let tables = self.tables()?;
        let mut reports: Vec<Report> = tables
            .reports
            .iter()
            .filter(|s| s.report.user_id == user_id)
            .map(|s| s.report.clone())
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }

    async fn create_chat_session(&self, session: NewChatSession) -> PortResult<ChatSession> {
        let now = Utc::now();
        let session = ChatSession {
            id: Uuid::new_v4(),
            user_id: session.user_id,
            report: session.report,
            report_key: session.report_key,
            language: session.language,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.tables()?.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_chat_session(&self, session_id: Uuid) -> PortResult<Option<ChatSession>> {
        Ok(self.tables()?.sessions.get(&session_id).cloned())
    }

    async fn find_chat_session_for_report(
        &self,
        user_id: &str,
        report_id: Uuid,
    ) -> PortResult<Option<ChatSession>> {
        let tables = self.tables()?;
        Ok(tables
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.report.report_id() == Some(report_id))
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn list_chat_sessions(&self, user_id: &str) -> PortResult<Vec<ChatSession>> {
        let tables = self.tables()?;
        let mut sessions: Vec<ChatSession> = tables
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn bind_chat_session_report(
        &self,
        session_id: Uuid,
        report_id: Uuid,
    ) -> PortResult<bool> {
        let mut tables = self.tables()?;
        let session = tables
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| PortError::NotFound(format!("Session {session_id} not found")))?;

        if !session.report.is_pending() {
            return Ok(false);
        }
        session.report = ReportBinding::Resolved(report_id);
        session.updated_at = Utc::now();
        Ok(true)
    }

    async fn append_chat_message(&self, session_id: Uuid, message: &Message) -> PortResult<()> {
        let mut tables = self.tables()?;
        let session = tables
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| PortError::NotFound(format!("Session {session_id} not found")))?;

        session.messages.push(message.clone());
        session.updated_at = Utc::now();
        Ok(())
    }

    async fn save_comparison(&self, comparison: NewComparison) -> PortResult<Comparison> {
        let comparison = Comparison {
            id: Uuid::new_v4(),
            user_id: comparison.user_id,
            key: comparison.key,
            result: comparison.result,
            created_at: Utc::now(),
        };
        self.tables()?.comparisons.push(comparison.clone());
        Ok(comparison)
    }

    async fn find_comparison(
        &self,
        user_id: &str,
        key: &ComparisonKey,
    ) -> PortResult<Option<Comparison>> {
        let tables = self.tables()?;
        Ok(tables
            .comparisons
            .iter()
            .rev()
            .find(|c| c.user_id == user_id && &c.key == key)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ReportSummary;
    use crate::domain::Role;
    use std::sync::Arc;

    fn new_session(user_id: &str) -> NewChatSession {
        NewChatSession {
            user_id: user_id.to_string(),
            report: ReportBinding::Pending,
            report_key: ReportKey::new("r.pdf", "cbc").unwrap(),
            language: "en".to_string(),
        }
    }

    #[tokio::test]
    async fn concurrent_appends_are_not_lost() {
        let db = Arc::new(InMemoryDatabase::new());
        let session_id = db.create_chat_session(new_session("u")).await.unwrap().id;

        let mut handles = Vec::new();
        for i in 0..20 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                let message = Message::new(Role::User, format!("m{i}"));
                db.append_chat_message(session_id, &message).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = db.get_chat_session(session_id).await.unwrap().unwrap();
        assert_eq!(stored.messages.len(), 20);
    }

    #[tokio::test]
    async fn bind_only_upgrades_pending_sessions_once() {
        let db = InMemoryDatabase::new();
        let session = db.create_chat_session(new_session("u")).await.unwrap();
        let report_id = Uuid::new_v4();

        assert!(db.bind_chat_session_report(session.id, report_id).await.unwrap());
        assert!(!db.bind_chat_session_report(session.id, Uuid::new_v4()).await.unwrap());

        let stored = db.get_chat_session(session.id).await.unwrap().unwrap();
        assert_eq!(stored.report, ReportBinding::Resolved(report_id));
    }

    #[tokio::test]
    async fn visibility_lag_hides_new_reports_for_n_lookups() {
        let db = InMemoryDatabase::with_visibility_lag(1);
        let key = ReportKey::new("a.pdf", "cbc").unwrap();
        db.create_report(NewReport {
            user_id: "u".to_string(),
            key: key.clone(),
            sanitized_text: "t".to_string(),
            summary: ReportSummary::Text("s".to_string()),
            language: "en".to_string(),
        })
        .await
        .unwrap();

        assert!(db.find_report("u", &key).await.unwrap().is_none());
        assert!(db.find_report("u", &key).await.unwrap().is_some());
        assert_eq!(db.report_lookups(), 2);
    }
}
