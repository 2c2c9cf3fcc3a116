//! crates/report_assistant_core/src/redactor.rs
//!
//! Regex-based removal of identifying fields from extracted report text.
//!
//! **Limitation:** this is a best-effort filter, not a certified
//! de-identification guarantee. It only catches the field shapes listed in
//! [`RULES`]; free-form mentions of a person elsewhere in the text survive.
//! Callers must not treat redacted text as anonymous data.
//!
//! Rules are applied one after another in the fixed order below, each
//! replacing its full match with [`REDACTION_MARKER`], so overlapping matches
//! always resolve the same way.

use regex::Regex;
use std::sync::LazyLock;

pub const REDACTION_MARKER: &str = "[REDACTED]";

struct RedactionRule {
    name: &'static str,
    regex: Regex,
}

/// `(rule name, pattern)` in application order. All patterns are case-insensitive.
/// Label rules are unanchored so a label glued to the preceding word still matches.
const RULE_SOURCES: &[(&str, &str)] = &[
    ("name_label", r"(?i)(?:Patient Name|Name)\s*[:\-].*"),
    ("age_label", r"(?i)(?:Age|DOB)\s*[:\-].*"),
    ("gender_label", r"(?i)(?:Gender|Sex)\s*[:\-].*"),
    ("patient_id_label", r"(?i)(?:UHID|Patient ID|MRN)\s*[:\-].*"),
    ("ten_digit_id", r"\b\d{10}\b"),
    ("date", r"\b\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4}\b"),
    ("doctor", r"(?i)Dr\.?\s+[A-Za-z ]+"),
    ("facility_label", r"(?i)(?:Hospital|Clinic)\s*[:\-].*"),
];

// A pattern that fails to compile is dropped rather than failing redaction.
static RULES: LazyLock<Vec<RedactionRule>> = LazyLock::new(|| {
    RULE_SOURCES
        .iter()
        .filter_map(|(name, source)| {
            Regex::new(source)
                .ok()
                .map(|regex| RedactionRule { name, regex })
        })
        .collect()
});

/// Per-rule match counts from one redaction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedactionStats {
    pub matches: Vec<(&'static str, usize)>,
}

impl RedactionStats {
    pub fn total(&self) -> usize {
        self.matches.iter().map(|(_, count)| count).sum()
    }
}

/// Replaces every identifying span in `text` with [`REDACTION_MARKER`].
pub fn redact(text: &str) -> String {
    redact_with_stats(text).0
}

/// Like [`redact`], also reporting how many spans each rule replaced.
pub fn redact_with_stats(text: &str) -> (String, RedactionStats) {
    let mut sanitized = text.to_string();
    let mut stats = RedactionStats::default();

    for rule in RULES.iter() {
        let count = rule.regex.find_iter(&sanitized).count();
        if count > 0 {
            sanitized = rule
                .regex
                .replace_all(&sanitized, REDACTION_MARKER)
                .into_owned();
            stats.matches.push((rule.name, count));
        }
    }

    (sanitized, stats)
}
