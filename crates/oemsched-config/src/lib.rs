//! Environment-first configuration, read once at startup.
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `DATABASE_URL` | yes | none |
//! | `GOOGLE_AI_API_KEY` / `GEMINI_API_KEY` | one of | none (`GOOGLE_AI_API_KEY` wins) |
//! | `GEMINI_MODEL` | no | `gemini-2.0-flash` |
//! | `OEMSCHED_RATE_LIMIT_SECS` | no | `1.5` |
//! | `OEMSCHED_FUZZY_THRESHOLD` | no | `0.80` |
//!
//! A missing credential is fatal before any work begins; everything else
//! has a default. Tunables are surfaced here (rather than buried as
//! constants) so test suites can pin them.

use std::time::Duration;

use oemsched_utils::error::ConfigError;

/// Default Gemini model identifier.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default minimum sleep between successful API calls.
pub const DEFAULT_RATE_LIMIT_SECS: f64 = 1.5;

/// Default fuzzy-match acceptance threshold for item canonicalization and
/// validation rule targeting.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.80;

/// Default response token cap. Reduced per-call for brands prone to
/// oversized responses (see the prompt builder's Mercedes appendix).
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 16_384;

/// Default sampling temperature. Low: extraction, not creativity.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Resolved pipeline configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub api_key: String,
    pub model: String,
    pub rate_limit: Duration,
    pub fuzzy_threshold: f64,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` when `DATABASE_URL` or both
    /// API key variables are absent, and `ConfigError::InvalidValue` when a
    /// tunable fails to parse or is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingRequired("DATABASE_URL".to_string()))?;

        let api_key = std::env::var("GOOGLE_AI_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .map_err(|_| {
                ConfigError::MissingRequired(
                    "GOOGLE_AI_API_KEY or GEMINI_API_KEY".to_string(),
                )
            })?;

        let model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let rate_limit_secs = parse_env_f64("OEMSCHED_RATE_LIMIT_SECS", DEFAULT_RATE_LIMIT_SECS)?;
        if rate_limit_secs < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "OEMSCHED_RATE_LIMIT_SECS".to_string(),
                value: rate_limit_secs.to_string(),
            });
        }

        let fuzzy_threshold =
            parse_env_f64("OEMSCHED_FUZZY_THRESHOLD", DEFAULT_FUZZY_THRESHOLD)?;
        if !(0.0..=1.0).contains(&fuzzy_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "OEMSCHED_FUZZY_THRESHOLD".to_string(),
                value: fuzzy_threshold.to_string(),
            });
        }

        Ok(Self {
            database_url,
            api_key,
            model,
            rate_limit: Duration::from_secs_f64(rate_limit_secs),
            fuzzy_threshold,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    /// Minimal configuration for unit tests; never touches the environment.
    #[must_use]
    pub fn minimal_for_testing() -> Self {
        Self {
            database_url: "postgres://localhost/oemsched_test".to_string(),
            api_key: "test-key".to_string(),
            model: DEFAULT_MODEL.to_string(),
            rate_limit: Duration::from_millis(0),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

fn parse_env_f64(key: &str, default: f64) -> Result<f64, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw.trim().parse::<f64>().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}
