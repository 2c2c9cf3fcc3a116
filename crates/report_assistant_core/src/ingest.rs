//! crates/report_assistant_core/src/ingest.rs
//!
//! The upload pipeline: extract, redact, analyze, persist. Only redacted text
//! ever leaves this module.

use std::sync::Arc;
use tracing::{error, info};

use crate::client::AnalysisClient;
use crate::domain::{NewReport, Report, ReportKey, Upload};
use crate::extraction::ExtractorRegistry;
use crate::language::normalize_language;
use crate::ports::{DatabaseService, PortError, PortResult};
use crate::redactor;
use crate::resolver::ReportResolver;

#[derive(Clone)]
pub struct ReportIngestor {
    db: Arc<dyn DatabaseService>,
    extractors: ExtractorRegistry,
    analysis: AnalysisClient,
    resolver: ReportResolver,
}

impl ReportIngestor {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        extractors: ExtractorRegistry,
        analysis: AnalysisClient,
        resolver: ReportResolver,
    ) -> Self {
        Self {
            db,
            extractors,
            analysis,
            resolver,
        }
    }

    /// Turns an uploaded document into a stored, analyzed report named after the file.
    pub async fn ingest(
        &self,
        user_id: &str,
        upload: Upload,
        report_type: &str,
        language: &str,
    ) -> PortResult<Report> {
        let key = ReportKey::new(&upload.file_name, report_type)?;
        let language = normalize_language(language);
        info!(user_id, report = %key, bytes = upload.bytes.len(), "Ingesting report");

        let extractor = self.extractors.for_upload(&upload);
        let bytes = upload.bytes;
        let raw_text = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
            .await
            .map_err(|e| PortError::Unexpected(format!("extraction task failed: {e}")))
            .and_then(|result| result)
            .map_err(|e| surface("extract", user_id, &key, e))?;

        let (sanitized_text, stats) = redactor::redact_with_stats(&raw_text);
        info!(
            user_id,
            report = %key,
            redacted_spans = stats.total(),
            "Sanitized extracted text"
        );

        let summary = self
            .analysis
            .summarize(&sanitized_text, &language)
            .await
            .map_err(|e| surface("summarize", user_id, &key, e))?;

        let report = self
            .db
            .create_report(NewReport {
                user_id: user_id.to_string(),
                key: key.clone(),
                sanitized_text,
                summary,
                language,
            })
            .await
            .map_err(|e| surface("persist", user_id, &key, e))?;

        info!(user_id, report_id = %report.id, "Report stored");
        Ok(report)
    }

    /// All of a user's reports, newest first.
    pub async fn list_reports(&self, user_id: &str) -> PortResult<Vec<Report>> {
        self.db.list_reports(user_id).await
    }

    /// Looks a report up by name and type through the resolver.
    pub async fn find_report(&self, user_id: &str, name: &str, report_type: &str) -> PortResult<Report> {
        let key = ReportKey::new(name, report_type)?;
        self.resolver
            .resolve(user_id, &key)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("Report {key} not found")))
    }
}

/// Keeps caller-actionable errors, turns everything else into a generic
/// `Processing` error after logging the cause.
fn surface(stage: &str, user_id: &str, key: &ReportKey, err: PortError) -> PortError {
    match err {
        PortError::Validation(_) | PortError::EmptyDocument | PortError::MalformedAnalysis(_) => {
            err
        }
        other => {
            error!(user_id, report = %key, stage, error = %other, "Report ingestion failed");
            PortError::Processing
        }
    }
}
