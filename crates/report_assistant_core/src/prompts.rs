//! crates/report_assistant_core/src/prompts.rs
//!
//! Instruction templates for the analysis engine. Rendering is a pure function
//! of the task, the language and the inputs, so identical inputs always yield
//! an identical prompt.

use crate::domain::Message;
use crate::language::language_instruction;
use crate::ports::{Prompt, ResponseFormat};

/// How many prior chat messages are replayed to the engine.
pub const CHAT_HISTORY_WINDOW: usize = 5;

const SUMMARY_INSTRUCTIONS: &str = r#"You are a medical report explanation assistant for rural clinics.

LANGUAGE RULE (MANDATORY):
{language_rule}

RULES:
- The report is anonymized. Never try to guess who the patient is.
- Do NOT diagnose.
- Do NOT suggest treatment or medicines.
- Explain findings in simple, patient-friendly language.
- Mention when values are high or low compared with standard reference ranges (WHO, NIH, Mayo Clinic).
- Suggest consulting a doctor when something is abnormal.
- Add a short disclaimer at the end of the summary."#;

const SUMMARY_JSON_CONTRACT: &str = r#"OUTPUT FORMAT (MANDATORY):
Return ONLY a JSON object, no prose and no code fences, with exactly these keys:
{
  "insights": [
    {"category": string, "emoji": string, "insight": string, "status": "positive" | "warning" | "negative" | "neutral"}
  ],
  "visualizations": [
    {"label": string, "value": number, "unit": string, "min_range": number | null, "max_range": number | null, "status": "Normal" | "High" | "Low"}
  ],
  "summary_text": string (markdown)
}

If the document is NOT a medical report, return exactly:
{"insights": [], "summary_text": "This document is not a medical report."}"#;

const SUMMARY_TEXT_CONTRACT: &str = r#"OUTPUT FORMAT:
Write a short markdown explanation with headings for Key Findings, What It Means and Next Steps.
If the document is NOT a medical report, reply exactly: This document is not a medical report."#;

const COMPARISON_INSTRUCTIONS: &str = r#"You are a medical report comparison assistant.

LANGUAGE RULE (MANDATORY):
{language_rule}

CRITICAL CONTEXT:
- Both reports belong to the SAME patient.
- Each report represents ONE medical test.
- Data is anonymized.

RULES:
- Do NOT diagnose.
- Do NOT suggest treatment.
- Only classify findings as Improved, Stable, or Worsened.
- Use simple language.
- End with a disclaimer."#;

const COMPARISON_JSON_CONTRACT: &str = r#"OUTPUT FORMAT (MANDATORY):
Return ONLY a JSON object, no prose and no code fences, with exactly these keys:
{
  "overall_status": "Improved" | "Stable" | "Worsened" | "Mixed",
  "status_color": "green" | "blue" | "red" | "orange",
  "changes": [{"parameter": string, "change_type": string, "details": string, "significance": string}],
  "visualizations": [{"label": string, "old_value": number | null, "new_value": number | null, "unit": string}],
  "summary_markdown": string,
  "recommendation": string,
  "disclaimer": string
}"#;

const COMPARISON_TEXT_CONTRACT: &str = r#"OUTPUT FORMAT:
Write a short markdown comparison listing each changed parameter as Improved, Stable or Worsened, then a one-line disclaimer."#;

const CHAT_INSTRUCTIONS: &str = r#"You are a helpful medical assistant chatbot designed for rural clinics.

LANGUAGE RULE (MANDATORY):
{language_rule}

STRICT BEHAVIOR RULES (MUST FOLLOW):
- Answer ONLY the user's question. Do not add extra information.
- Base your response ONLY on the provided Medical Report Summary and the Previous Conversation.
- Do NOT use outside medical knowledge.
- Do NOT diagnose any disease or condition.
- Do NOT suggest treatments, medicines, tests, dosages, or home remedies.
- If the answer is NOT clearly mentioned in the report, say exactly:
  "This information is not mentioned in the report"
- Use very simple, patient-friendly language. Keep answers short.
- Be calm, empathetic, and reassuring.

RESPONSE FORMAT (MANDATORY):
1. **Direct Answer**: a clear and specific answer to the question.
2. **Based on the Report**: which part of the report the answer comes from, or that it is not mentioned.
3. **Doctor Reminder**: one simple sentence reminding the user to consult a doctor."#;

const CHAT_INPUT_TEMPLATE: &str = r#"Medical Report Summary:
---
{summary}
---

Previous Conversation Context (if any):
{history}

User Question:
{question}"#;

pub fn summary_prompt(sanitized_text: &str, language: &str, format: ResponseFormat) -> Prompt {
    let contract = match format {
        ResponseFormat::Json => SUMMARY_JSON_CONTRACT,
        ResponseFormat::Text => SUMMARY_TEXT_CONTRACT,
    };
    Prompt {
        instructions: format!(
            "{}\n\n{}",
            SUMMARY_INSTRUCTIONS.replace("{language_rule}", &language_instruction(language)),
            contract
        ),
        input: format!("Medical Report:\n{sanitized_text}"),
        format,
    }
}

pub fn comparison_prompt(
    old_summary: &str,
    new_summary: &str,
    language: &str,
    format: ResponseFormat,
) -> Prompt {
    let contract = match format {
        ResponseFormat::Json => COMPARISON_JSON_CONTRACT,
        ResponseFormat::Text => COMPARISON_TEXT_CONTRACT,
    };
    Prompt {
        instructions: format!(
            "{}\n\n{}",
            COMPARISON_INSTRUCTIONS.replace("{language_rule}", &language_instruction(language)),
            contract
        ),
        input: format!(
            "Old Report Summary:\n{old_summary}\n\nNew Report Summary:\n{new_summary}\n\nTask:\nCompare the reports and explain changes clearly."
        ),
        format,
    }
}

pub fn chat_prompt(summary: &str, history: &[Message], question: &str, language: &str) -> Prompt {
    let history = render_history(history);
    Prompt {
        instructions: CHAT_INSTRUCTIONS
            .replace("{language_rule}", &language_instruction(language)),
        input: fill_template(
            CHAT_INPUT_TEMPLATE,
            &[
                ("summary", summary),
                ("history", history.as_str()),
                ("question", question),
            ],
        ),
        format: ResponseFormat::Text,
    }
}

/// Substitutes `{key}` placeholders in one left-to-right pass. Substituted
/// values are never rescanned; unknown placeholders are left as written.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Renders the last [`CHAT_HISTORY_WINDOW`] messages as `Role: content` lines.
fn render_history(history: &[Message]) -> String {
    let start = history.len().saturating_sub(CHAT_HISTORY_WINDOW);
    let lines: Vec<String> = history[start..]
        .iter()
        .map(|m| {
            let role = m.role.as_str();
            let mut label = role[..1].to_uppercase();
            label.push_str(&role[1..]);
            format!("{label}: {}", m.content)
        })
        .collect();

    if lines.is_empty() {
        "(none)".to_string()
    } else {
        lines.join("\n")
    }
}
