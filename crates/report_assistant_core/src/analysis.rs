//! crates/report_assistant_core/src/analysis.rs
//!
//! The response contract of the external analysis engine: the structured
//! report and comparison schemas, plus the parsing rules that turn raw engine
//! output into those types.
//!
//! Parsing is strict. A response that is blank, is not JSON, or lacks a
//! required key is a [`PortError::MalformedAnalysis`]; nothing is repaired or
//! retried here.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ports::{PortError, PortResult};

/// The `summary_text` of the analysis the engine returns for a non-medical document.
pub const NON_MEDICAL_SUMMARY: &str = "This document is not a medical report.";

//=========================================================================================
// Report Analysis Schema
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightStatus {
    Positive,
    Warning,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub category: String,
    pub emoji: String,
    pub insight: String,
    pub status: InsightStatus,
}

/// Where a measured value sits relative to its reference range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeStatus {
    Normal,
    High,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visualization {
    pub label: String,
    pub value: f64,
    pub unit: String,
    pub min_range: Option<f64>,
    pub max_range: Option<f64>,
    pub status: RangeStatus,
}

/// The structured analysis of a single report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawReportAnalysis")]
pub struct ReportAnalysis {
    pub insights: Vec<Insight>,
    pub visualizations: Vec<Visualization>,
    /// Markdown.
    pub summary_text: String,
}

/// Wire form of [`ReportAnalysis`]. `visualizations` may only be absent in the
/// non-medical sentinel.
#[derive(Deserialize)]
struct RawReportAnalysis {
    insights: Vec<Insight>,
    visualizations: Option<Vec<Visualization>>,
    summary_text: String,
}

impl TryFrom<RawReportAnalysis> for ReportAnalysis {
    type Error = String;

    fn try_from(raw: RawReportAnalysis) -> Result<Self, Self::Error> {
        let has_visualizations = raw.visualizations.is_some();
        let analysis = ReportAnalysis {
            insights: raw.insights,
            visualizations: raw.visualizations.unwrap_or_default(),
            summary_text: raw.summary_text,
        };
        match has_visualizations {
            true => Ok(analysis),
            false if analysis.is_non_medical() => Ok(Self::non_medical()),
            false => Err("missing field `visualizations`".to_string()),
        }
    }
}

impl ReportAnalysis {
    fn non_medical() -> Self {
        Self {
            insights: Vec::new(),
            visualizations: Vec::new(),
            summary_text: NON_MEDICAL_SUMMARY.to_string(),
        }
    }

    /// True when the engine classified the document as not being a medical report.
    pub fn is_non_medical(&self) -> bool {
        self.insights.is_empty() && self.summary_text.trim() == NON_MEDICAL_SUMMARY
    }
}

//=========================================================================================
// Comparison Schema
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallStatus {
    Improved,
    Stable,
    Worsened,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Green,
    Blue,
    Red,
    Orange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub parameter: String,
    pub change_type: String,
    pub details: String,
    pub significance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonVisualization {
    pub label: String,
    pub old_value: Option<f64>,
    pub new_value: Option<f64>,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub overall_status: OverallStatus,
    pub status_color: StatusColor,
    pub changes: Vec<Change>,
    pub visualizations: Vec<ComparisonVisualization>,
    pub summary_markdown: String,
    pub recommendation: String,
    pub disclaimer: String,
}

//=========================================================================================
// Stored Summaries
//=========================================================================================

/// The derived summary stored with a report, in whichever mode produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "content", rename_all = "snake_case")]
pub enum ReportSummary {
    Structured(ReportAnalysis),
    Text(String),
}

impl ReportSummary {
    /// Renders the summary as prompt context for follow-up tasks.
    pub fn as_prompt_context(&self) -> String {
        match self {
            ReportSummary::Structured(analysis) => serde_json::to_string_pretty(analysis)
                .unwrap_or_else(|_| analysis.summary_text.clone()),
            ReportSummary::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "content", rename_all = "snake_case")]
pub enum ComparisonSummary {
    Structured(ComparisonResult),
    Text(String),
}

//=========================================================================================
// Response Parsing
//=========================================================================================

/// Removes a leading ```` ``` ```` / ```` ```json ```` fence line and a trailing fence, if present.
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string ("json", "JSON", ...) on the opening fence line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Checks the free-text contract: the response must not be blank.
pub fn parse_text(response: &str) -> PortResult<String> {
    let text = response.trim();
    if text.is_empty() {
        return Err(PortError::MalformedAnalysis(
            "analysis engine returned an empty response".to_string(),
        ));
    }
    Ok(text.to_string())
}

/// Parses a structured response into `T`, stripping incidental code fences first.
pub fn parse_structured<T: DeserializeOwned>(response: &str) -> PortResult<T> {
    let body = strip_code_fence(response);
    if body.is_empty() {
        return Err(PortError::MalformedAnalysis(
            "analysis engine returned an empty response".to_string(),
        ));
    }
    serde_json::from_str(body)
        .map_err(|e| PortError::MalformedAnalysis(format!("invalid structured response: {e}")))
}

pub fn parse_report_analysis(response: &str) -> PortResult<ReportAnalysis> {
    parse_structured(response)
}

pub fn parse_comparison(response: &str) -> PortResult<ComparisonResult> {
    parse_structured(response)
}
