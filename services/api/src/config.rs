//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use report_assistant_core::{ResponseMode, RetryPolicy};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Gemini's OpenAI-compatible endpoint, used when only a Gemini key is configured.
pub const GEMINI_OPENAI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible endpoint for analysis requests.
    pub analysis_api_base: Option<String>,
    pub analysis_model: String,
    pub analysis_temperature: f32,
    pub response_mode: ResponseMode,
    pub retry_policy: RetryPolicy,
    pub sst_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub cors_origin: String,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load API Keys (as optional) ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok();

        // --- Load Analysis Settings ---
        let analysis_api_base = std::env::var("ANALYSIS_API_BASE").ok();
        let analysis_model =
            std::env::var("ANALYSIS_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let analysis_temperature = parse_var("ANALYSIS_TEMPERATURE", 0.2_f32)?;
        let response_mode = parse_var("RESPONSE_MODE", ResponseMode::Structured)?;

        let max_attempts = parse_var("RESOLVER_MAX_ATTEMPTS", RetryPolicy::DEFAULT_MAX_ATTEMPTS)?;
        let interval_ms = parse_var(
            "RESOLVER_INTERVAL_MS",
            RetryPolicy::DEFAULT_INTERVAL.as_millis() as u64,
        )?;
        let retry_policy = RetryPolicy::new(max_attempts, Duration::from_millis(interval_ms));

        // --- Load Adapter-specific Settings ---
        let sst_model = std::env::var("SST_MODEL").unwrap_or_else(|_| "whisper-1".to_string());
        let tts_model = std::env::var("TTS_MODEL").unwrap_or_else(|_| "tts-1".to_string());
        let tts_voice = std::env::var("TTS_VOICE").unwrap_or_else(|_| "alloy".to_string());

        // --- Load HTTP Settings ---
        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let max_upload_bytes = parse_var("MAX_UPLOAD_BYTES", 10 * 1024 * 1024_usize)?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            openai_api_key,
            gemini_api_key,
            analysis_api_base,
            analysis_model,
            analysis_temperature,
            response_mode,
            retry_policy,
            sst_model,
            tts_model,
            tts_voice,
            cors_origin,
            max_upload_bytes,
        })
    }

    /// The key and base URL for analysis requests.
    ///
    /// An explicit `ANALYSIS_API_BASE` wins. Otherwise OpenAI is preferred, with
    /// Gemini's compatible endpoint as the fallback.
    pub fn analysis_endpoint(&self) -> Result<(String, Option<String>), ConfigError> {
        match (&self.openai_api_key, &self.gemini_api_key) {
            (Some(key), _) => Ok((key.clone(), self.analysis_api_base.clone())),
            (None, Some(key)) => Ok((
                key.clone(),
                Some(
                    self.analysis_api_base
                        .clone()
                        .unwrap_or_else(|| GEMINI_OPENAI_BASE.to_string()),
                ),
            )),
            (None, None) => Err(ConfigError::MissingVar(
                "OPENAI_API_KEY or GEMINI_API_KEY".to_string(),
            )),
        }
    }
}

/// Reads and parses an optional variable, falling back to `default` when unset.
fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_keys(openai: Option<&str>, gemini: Option<&str>, base: Option<&str>) -> Config {
        Config {
            bind_address: "127.0.0.1:3000".parse().unwrap(),
            database_url: None,
            log_level: Level::INFO,
            openai_api_key: openai.map(str::to_string),
            gemini_api_key: gemini.map(str::to_string),
            analysis_api_base: base.map(str::to_string),
            analysis_model: "gpt-4o-mini".to_string(),
            analysis_temperature: 0.2,
            response_mode: ResponseMode::Structured,
            retry_policy: RetryPolicy::default(),
            sst_model: "whisper-1".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            cors_origin: "http://localhost:5173".to_string(),
            max_upload_bytes: 1024,
        }
    }

    #[test]
    fn openai_key_wins_over_gemini() {
        let config = config_with_keys(Some("sk-openai"), Some("gm"), None);
        assert_eq!(config.analysis_endpoint().unwrap(), ("sk-openai".to_string(), None));
    }

    #[test]
    fn gemini_key_defaults_to_compatible_base() {
        let config = config_with_keys(None, Some("gm"), None);
        let (key, base) = config.analysis_endpoint().unwrap();
        assert_eq!(key, "gm");
        assert_eq!(base.as_deref(), Some(GEMINI_OPENAI_BASE));
    }

    #[test]
    fn no_key_is_a_missing_var() {
        let config = config_with_keys(None, None, Some("http://localhost:8080/v1"));
        assert!(matches!(config.analysis_endpoint(), Err(ConfigError::MissingVar(_))));
    }
}
