//! crates/report_assistant_core/src/resolver.rs
//!
//! Point lookup of a report with bounded retry.
//!
//! The store may take a moment to make a freshly written report visible to
//! exact-match queries. The resolver bridges that window by retrying the
//! lookup at a fixed interval. Every call site that needs a report by
//! name and type goes through here, so they all behave the same.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::{Report, ReportKey};
use crate::ports::{DatabaseService, PortResult};

/// How many times to look, and how long to wait between looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

    /// A policy with at least one attempt.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// A single attempt with no waiting.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_INTERVAL)
    }
}

#[derive(Clone)]
pub struct ReportResolver {
    db: Arc<dyn DatabaseService>,
    policy: RetryPolicy,
}

impl ReportResolver {
    pub fn new(db: Arc<dyn DatabaseService>, policy: RetryPolicy) -> Self {
        Self { db, policy }
    }

    /// Resolves a report with the configured policy.
    ///
    /// `Ok(None)` means every attempt missed; that is an expected outcome,
    /// not an error. Store failures are returned immediately.
    pub async fn resolve(&self, user_id: &str, key: &ReportKey) -> PortResult<Option<Report>> {
        self.resolve_with(user_id, key, self.policy).await
    }

    pub async fn resolve_with(
        &self,
        user_id: &str,
        key: &ReportKey,
        policy: RetryPolicy,
    ) -> PortResult<Option<Report>> {
        let attempts = policy.max_attempts.max(1);

        for attempt in 1..=attempts {
            if let Some(report) = self.db.find_report(user_id, key).await? {
                debug!(user_id, report_id = %report.id, attempt, "Resolved report");
                return Ok(Some(report));
            }

            if attempt < attempts {
                info!(user_id, report = %key, attempt, "Report not visible yet, retrying");
                tokio::time::sleep(policy.interval).await;
            }
        }

        warn!(user_id, report = %key, attempts, "Report not found after all attempts");
        Ok(None)
    }
}
