//! crates/report_assistant_core/src/comparator.rs
//!
//! Compares two of a user's reports, optionally uploading the newer one in
//! the same call. Results are cached per normalized key pair.

use std::sync::Arc;
use tracing::{debug, info};

use crate::client::AnalysisClient;
use crate::domain::{Comparison, ComparisonKey, NewComparison, Report, ReportKey, Upload};
use crate::ingest::ReportIngestor;
use crate::language::normalize_language;
use crate::ports::{DatabaseService, PortError, PortResult};
use crate::resolver::ReportResolver;

#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub old_name: String,
    pub old_type: String,
    /// Required unless `upload` is set, in which case the file name is used.
    pub new_name: Option<String>,
    /// Always required.
    pub new_type: Option<String>,
    pub language: String,
    pub upload: Option<Upload>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonOutcome {
    pub comparison: Comparison,
    /// True when the result came from the cache and the engine was not called.
    pub cached: bool,
}

#[derive(Clone)]
pub struct Comparator {
    db: Arc<dyn DatabaseService>,
    resolver: ReportResolver,
    ingestor: ReportIngestor,
    analysis: AnalysisClient,
}

impl Comparator {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        resolver: ReportResolver,
        ingestor: ReportIngestor,
        analysis: AnalysisClient,
    ) -> Self {
        Self {
            db,
            resolver,
            ingestor,
            analysis,
        }
    }

    pub async fn compare(
        &self,
        user_id: &str,
        request: CompareRequest,
    ) -> PortResult<ComparisonOutcome> {
        let language = normalize_language(&request.language);
        let old_key = ReportKey::new(&request.old_name, &request.old_type)?;
        let old = self.resolve(user_id, &old_key, "Old report").await?;

        let new_type = request
            .new_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| PortError::Validation("new report type is required".to_string()))?;

        let uploaded = request.upload.is_some();
        let new = match request.upload {
            Some(upload) => {
                let ingested = self
                    .ingestor
                    .ingest(user_id, upload, new_type, &language)
                    .await?;
                // Confirm the fresh report is visible before comparing against it.
                self.resolve(user_id, &ingested.key, "New report").await?
            }
            None => {
                let new_name = request
                    .new_name
                    .as_deref()
                    .ok_or_else(|| PortError::Validation("new report name is required".to_string()))?;
                let new_key = ReportKey::new(new_name, new_type)?;
                self.resolve(user_id, &new_key, "New report").await?
            }
        };

        let key = ComparisonKey {
            old: old.key.clone(),
            new: new.key.clone(),
        };

        if !uploaded {
            if let Some(comparison) = self.db.find_comparison(user_id, &key).await? {
                debug!(user_id, comparison_id = %comparison.id, "Serving cached comparison");
                return Ok(ComparisonOutcome {
                    comparison,
                    cached: true,
                });
            }
        }

        let result = self
            .analysis
            .compare(&old.summary, &new.summary, &language)
            .await?;

        let comparison = self
            .db
            .save_comparison(NewComparison {
                user_id: user_id.to_string(),
                key,
                result,
            })
            .await?;

        info!(
            user_id,
            comparison_id = %comparison.id,
            old_report_id = %old.id,
            new_report_id = %new.id,
            "Stored new comparison"
        );
        Ok(ComparisonOutcome {
            comparison,
            cached: false,
        })
    }

    /// Returns a previously stored comparison without calling the engine.
    pub async fn get_comparison(&self, user_id: &str, key: &ComparisonKey) -> PortResult<Comparison> {
        self.db
            .find_comparison(user_id, key)
            .await?
            .ok_or_else(|| {
                PortError::NotFound(format!("Comparison of {} and {} not found", key.old, key.new))
            })
    }

    async fn resolve(&self, user_id: &str, key: &ReportKey, what: &str) -> PortResult<Report> {
        self.resolver
            .resolve(user_id, key)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("{what} {key} not found")))
    }
}
