//! crates/report_assistant_core/src/sessions.rs
//!
//! Chat session lifecycle: creation (idempotent per report), ownership-checked
//! reads, and message exchange with the analysis engine.
//!
//! A session may be opened before its report is visible to queries. It is
//! then stored as `ReportBinding::Pending` and bound to the report the first
//! time a later lookup succeeds.

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::AnalysisClient;
use crate::domain::{ChatSession, Message, NewChatSession, ReportBinding, ReportKey, Role};
use crate::language::normalize_language;
use crate::ports::{DatabaseService, PortError, PortResult};
use crate::resolver::ReportResolver;

/// The assistant's answer to one user message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub session_id: Uuid,
    pub response: String,
    /// The binding after this exchange.
    pub report: ReportBinding,
}

#[derive(Clone)]
pub struct SessionManager {
    db: Arc<dyn DatabaseService>,
    resolver: ReportResolver,
    analysis: AnalysisClient,
}

impl SessionManager {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        resolver: ReportResolver,
        analysis: AnalysisClient,
    ) -> Self {
        Self {
            db,
            resolver,
            analysis,
        }
    }

    /// Opens (or reopens) the chat session for a report.
    ///
    /// Once the report resolves, repeated calls return the same session. If it
    /// does not resolve within the retry policy, a pending session is created
    /// instead of failing.
    pub async fn create_session(
        &self,
        user_id: &str,
        report_name: &str,
        report_type: &str,
        language: &str,
    ) -> PortResult<ChatSession> {
        let key = ReportKey::new(report_name, report_type)?;
        let language = normalize_language(language);

        let binding = match self.resolver.resolve(user_id, &key).await? {
            Some(report) => {
                if let Some(existing) = self
                    .db
                    .find_chat_session_for_report(user_id, report.id)
                    .await?
                {
                    debug!(user_id, session_id = %existing.id, "Returning existing chat session");
                    return Ok(existing);
                }
                ReportBinding::Resolved(report.id)
            }
            None => {
                warn!(user_id, report = %key, "Creating chat session before report is visible");
                ReportBinding::Pending
            }
        };

        let session = self
            .db
            .create_chat_session(NewChatSession {
                user_id: user_id.to_string(),
                report: binding,
                report_key: key,
                language,
            })
            .await?;

        info!(user_id, session_id = %session.id, pending = binding.is_pending(), "Created chat session");
        Ok(session)
    }

    /// Fetches a session; absent and foreign sessions look the same.
    pub async fn get_session(&self, session_id: Uuid, user_id: &str) -> PortResult<ChatSession> {
        match self.db.get_chat_session(session_id).await? {
            Some(session) if session.is_owned_by(user_id) => Ok(session),
            Some(_) => {
                warn!(user_id, %session_id, "Rejected access to another user's session");
                Err(PortError::NotFound(format!("Session {session_id} not found")))
            }
            None => Err(PortError::NotFound(format!("Session {session_id} not found"))),
        }
    }

    pub async fn list_sessions(&self, user_id: &str) -> PortResult<Vec<ChatSession>> {
        self.db.list_chat_sessions(user_id).await
    }

    /// Sends a user message and returns the assistant's reply.
    ///
    /// Both messages are appended individually at the store, so concurrent
    /// sends to one session never overwrite each other.
    pub async fn send_message(
        &self,
        session_id: Uuid,
        user_id: &str,
        message: &str,
        language: &str,
    ) -> PortResult<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(PortError::Validation("message is required".to_string()));
        }
        let language = normalize_language(language);

        let session = self.get_session(session_id, user_id).await?;

        let report = self
            .resolver
            .resolve(user_id, &session.report_key)
            .await?
            .ok_or_else(|| PortError::ReportNotFound(session.report_key.to_string()))?;

        let mut binding = session.report;
        if binding.is_pending() {
            if self.db.bind_chat_session_report(session_id, report.id).await? {
                info!(user_id, %session_id, report_id = %report.id, "Bound pending chat session to report");
            }
            binding = ReportBinding::Resolved(report.id);
        }

        // The engine sees the history as it was before this message.
        let history = session.messages;

        self.db
            .append_chat_message(session_id, &Message::new(Role::User, message))
            .await?;

        let response = self
            .analysis
            .chat(&report.summary, &history, message, &language)
            .await?;

        self.db
            .append_chat_message(session_id, &Message::new(Role::Assistant, response.clone()))
            .await?;

        debug!(user_id, %session_id, history = history.len(), "Answered chat message");
        Ok(ChatReply {
            session_id,
            response,
            report: binding,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ReportSummary;
    use crate::client::ResponseMode;
    use crate::domain::{NewReport, SessionState};
    use crate::memory::InMemoryDatabase;
    use crate::ports::{AnalysisEngine, Prompt};
    use crate::resolver::RetryPolicy;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct EchoEngine {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AnalysisEngine for EchoEngine {
        async fn analyze(&self, _prompt: &Prompt) -> PortResult<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("answer {n}"))
        }
    }

    struct Fixture {
        db: Arc<InMemoryDatabase>,
        engine: Arc<EchoEngine>,
        manager: SessionManager,
    }

    fn fixture(lag: usize) -> Fixture {
        let db = Arc::new(InMemoryDatabase::with_visibility_lag(lag));
        let engine = Arc::new(EchoEngine::default());
        let manager = SessionManager::new(
            db.clone(),
            ReportResolver::new(db.clone(), RetryPolicy::new(3, Duration::from_millis(500))),
            AnalysisClient::new(engine.clone(), ResponseMode::Structured),
        );
        Fixture { db, engine, manager }
    }

    async fn store_report(db: &InMemoryDatabase, user_id: &str) -> uuid::Uuid {
        db.create_report(NewReport {
            user_id: user_id.to_string(),
            key: ReportKey::new("lipid.pdf", "LIPID").unwrap(),
            sanitized_text: "LDL 160 mg/dL".to_string(),
            summary: ReportSummary::Text("LDL is high".to_string()),
            language: "en".to_string(),
        })
        .await
        .unwrap()
        .id
    }

    #[tokio::test(start_paused = true)]
    async fn create_session_is_idempotent_once_resolved() {
        let f = fixture(0);
        let report_id = store_report(&f.db, "u1").await;

        let first = f.manager.create_session("u1", "Lipid.pdf ", "lipid", "en").await.unwrap();
        let second = f.manager.create_session("u1", "lipid.pdf", "LIPID", "en").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.report, ReportBinding::Resolved(report_id));
        assert_eq!(f.db.list_chat_sessions("u1").await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unresolved_report_yields_pending_session() {
        let f = fixture(0);

        let session = f.manager.create_session("u1", "lipid.pdf", "LIPID", "hi").await.unwrap();

        assert!(session.report.is_pending());
        assert_eq!(session.state(), SessionState::Created);
        assert_eq!(session.language, "hi");
        assert_eq!(f.db.report_lookups(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_session_is_bound_exactly_once_on_send() {
        let f = fixture(0);
        let pending = f.manager.create_session("u1", "lipid.pdf", "LIPID", "en").await.unwrap();
        assert!(pending.report.is_pending());

        let report_id = store_report(&f.db, "u1").await;

        let reply = f.manager.send_message(pending.id, "u1", "Is my LDL ok?", "en").await.unwrap();
        assert_eq!(reply.report, ReportBinding::Resolved(report_id));
        assert_eq!(reply.response, "answer 1");

        let stored = f.manager.get_session(pending.id, "u1").await.unwrap();
        assert_eq!(stored.report, ReportBinding::Resolved(report_id));
        assert_eq!(stored.state(), SessionState::Resolved);

        // A second send finds the session already bound and leaves it alone.
        f.manager.send_message(pending.id, "u1", "And HDL?", "en").await.unwrap();
        assert!(!f.db.bind_chat_session_report(pending.id, uuid::Uuid::new_v4()).await.unwrap());
        let stored = f.manager.get_session(pending.id, "u1").await.unwrap();
        assert_eq!(stored.report, ReportBinding::Resolved(report_id));
        assert_eq!(stored.messages.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn send_on_unresolvable_report_appends_nothing() {
        let f = fixture(0);
        let pending = f.manager.create_session("u1", "lipid.pdf", "LIPID", "en").await.unwrap();

        let err = f.manager.send_message(pending.id, "u1", "hello", "en").await.unwrap_err();

        assert!(matches!(err, PortError::ReportNotFound(_)));
        let stored = f.manager.get_session(pending.id, "u1").await.unwrap();
        assert!(stored.messages.is_empty());
        assert_eq!(f.engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn messages_are_ordered_and_history_is_passed() {
        let f = fixture(0);
        store_report(&f.db, "u1").await;
        let session = f.manager.create_session("u1", "lipid.pdf", "LIPID", "en").await.unwrap();

        f.manager.send_message(session.id, "u1", "first", "en").await.unwrap();
        f.manager.send_message(session.id, "u1", "second", "en").await.unwrap();

        let stored = f.manager.get_session(session.id, "u1").await.unwrap();
        let transcript: Vec<(Role, &str)> = stored
            .messages
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(
            transcript,
            vec![
                (Role::User, "first"),
                (Role::Assistant, "answer 1"),
                (Role::User, "second"),
                (Role::Assistant, "answer 2"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_are_invisible_to_other_users() {
        let f = fixture(0);
        store_report(&f.db, "u1").await;
        let session = f.manager.create_session("u1", "lipid.pdf", "LIPID", "en").await.unwrap();

        assert!(matches!(
            f.manager.get_session(session.id, "u2").await,
            Err(PortError::NotFound(_))
        ));
        assert!(matches!(
            f.manager.send_message(session.id, "u2", "hi", "en").await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn blank_message_is_rejected() {
        let f = fixture(0);
        let err = f
            .manager
            .send_message(uuid::Uuid::new_v4(), "u1", "   ", "en")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn lagging_report_resolves_within_retry_window() {
        let f = fixture(2);
        let report_id = store_report(&f.db, "u1").await;

        let session = f.manager.create_session("u1", "lipid.pdf", "LIPID", "en").await.unwrap();
        assert_eq!(session.report, ReportBinding::Resolved(report_id));
    }
}
