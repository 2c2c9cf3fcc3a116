//! crates/report_assistant_core/src/language.rs
//!
//! Supported response languages and the instruction line injected into prompts.

pub const DEFAULT_LANGUAGE: &str = "en";

/// `(code, display name, English name)`.
const LANGUAGES: &[(&str, &str, &str)] = &[
    ("en", "English (India)", "English"),
    ("hi", "Hindi (भारत)", "Hindi"),
    ("mr", "Marathi (मराठी)", "Marathi"),
];

/// Lower-cases and trims a language code, falling back to English when unsupported.
pub fn normalize_language(code: &str) -> String {
    let code = code.trim().to_lowercase();
    if LANGUAGES.iter().any(|(c, _, _)| *c == code) {
        code
    } else {
        DEFAULT_LANGUAGE.to_string()
    }
}

/// The language rule placed at the top of every prompt.
pub fn language_instruction(code: &str) -> String {
    let code = normalize_language(code);
    let name = LANGUAGES
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, _, english)| *english)
        .unwrap_or("English");

    if code == DEFAULT_LANGUAGE {
        "Respond in simple English.".to_string()
    } else {
        format!(
            "Respond ONLY in {name}. Use simple, everyday {name} words. \
             Keep medical test names and units (e.g. Hemoglobin, g/dL) as they appear in the report."
        )
    }
}

/// `(code, display name)` pairs for the languages offered to users.
pub fn supported_languages() -> Vec<(&'static str, &'static str)> {
    LANGUAGES
        .iter()
        .map(|(code, display, _)| (*code, *display))
        .collect()
}
