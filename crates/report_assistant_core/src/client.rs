//! crates/report_assistant_core/src/client.rs
//!
//! The analysis client: renders prompts, submits them to the injected
//! [`AnalysisEngine`] and validates what comes back.
//!
//! A response that breaks the contract is returned as an error and never
//! retried; retrying a non-deterministic generator would only hide a broken
//! prompt. The client keeps no cache of its own.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::analysis::{self, ComparisonSummary, ReportSummary};
use crate::domain::Message;
use crate::ports::{AnalysisEngine, PortResult, ResponseFormat};
use crate::prompts;

/// Which contract the engine is held to for report analysis and comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// JSON matching the fixed schemas in [`crate::analysis`].
    #[default]
    Structured,
    /// Any non-empty text.
    FreeText,
}

impl ResponseMode {
    fn format(self) -> ResponseFormat {
        match self {
            ResponseMode::Structured => ResponseFormat::Json,
            ResponseMode::FreeText => ResponseFormat::Text,
        }
    }
}

impl std::str::FromStr for ResponseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "structured" | "json" => Ok(ResponseMode::Structured),
            "text" | "free_text" | "freetext" => Ok(ResponseMode::FreeText),
            other => Err(format!("'{other}' is not a response mode")),
        }
    }
}

#[derive(Clone)]
pub struct AnalysisClient {
    engine: Arc<dyn AnalysisEngine>,
    mode: ResponseMode,
}

impl AnalysisClient {
    pub fn new(engine: Arc<dyn AnalysisEngine>, mode: ResponseMode) -> Self {
        Self { engine, mode }
    }

    /// Analyzes one sanitized report.
    pub async fn summarize(&self, sanitized_text: &str, language: &str) -> PortResult<ReportSummary> {
        let prompt = prompts::summary_prompt(sanitized_text, language, self.mode.format());
        let response = self.engine.analyze(&prompt).await?;

        let summary = match self.mode {
            ResponseMode::Structured => {
                let parsed = analysis::parse_report_analysis(&response).inspect_err(|e| {
                    warn!(error = %e, "Report analysis violated the structured contract");
                })?;
                if parsed.is_non_medical() {
                    debug!("Engine classified the document as non-medical");
                }
                ReportSummary::Structured(parsed)
            }
            ResponseMode::FreeText => ReportSummary::Text(analysis::parse_text(&response)?),
        };
        Ok(summary)
    }

    /// Compares an older and a newer report summary.
    pub async fn compare(
        &self,
        old_summary: &ReportSummary,
        new_summary: &ReportSummary,
        language: &str,
    ) -> PortResult<ComparisonSummary> {
        let prompt = prompts::comparison_prompt(
            &old_summary.as_prompt_context(),
            &new_summary.as_prompt_context(),
            language,
            self.mode.format(),
        );
        let response = self.engine.analyze(&prompt).await?;

        match self.mode {
            ResponseMode::Structured => {
                let parsed = analysis::parse_comparison(&response).inspect_err(|e| {
                    warn!(error = %e, "Comparison violated the structured contract");
                })?;
                Ok(ComparisonSummary::Structured(parsed))
            }
            ResponseMode::FreeText => Ok(ComparisonSummary::Text(analysis::parse_text(&response)?)),
        }
    }

    /// Answers a chat question. Always free text, whatever the configured mode.
    pub async fn chat(
        &self,
        report_summary: &ReportSummary,
        history: &[Message],
        question: &str,
        language: &str,
    ) -> PortResult<String> {
        let prompt = prompts::chat_prompt(
            &report_summary.as_prompt_context(),
            history,
            question,
            language,
        );
        let response = self.engine.analyze(&prompt).await?;
        analysis::parse_text(&response)
    }
}
