//! Shared error types for the extraction pipeline.
//!
//! Domain-specific errors (`StoreError`, `PipelineError`) live next to the
//! code that produces them; this module holds the error types that cross
//! crate boundaries: configuration, LLM transport, and JSON extraction.

use thiserror::Error;

use crate::exit_codes::ExitCode;

/// Configuration errors, raised once at startup before any work begins.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    MissingRequired(String),

    #[error("invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

impl ConfigError {
    /// Configuration problems always map to a startup failure.
    #[must_use]
    pub const fn to_exit_code(&self) -> ExitCode {
        ExitCode::STARTUP_FAILURE
    }
}

/// Errors from the LLM backend.
///
/// Transient HTTP statuses (429/500/503) are retried inside the client; the
/// variants here are all terminal from the caller's perspective.
#[derive(Error, Debug)]
pub enum LlmError {
    /// The backend could not be constructed (bad URL, client build failure).
    #[error("LLM misconfiguration: {0}")]
    Misconfiguration(String),

    /// Network-level or non-retryable HTTP failure.
    #[error("LLM transport error: {0}")]
    Transport(String),

    /// A retryable status persisted through every backoff attempt.
    #[error("LLM retries exhausted after {attempts} attempts (last status {status})")]
    RetriesExhausted { status: u16, attempts: u32 },

    /// The HTTP exchange succeeded but the response body carried no text.
    #[error("LLM response contained no text content")]
    EmptyResponse,

    /// Every parse attempt failed despite a successful HTTP exchange.
    ///
    /// Carries the raw response text so the caller can persist it for
    /// post-mortem inspection.
    #[error("LLM response was not parseable JSON: {reason}")]
    Unparseable { reason: String, raw: String },
}

/// Structural failures from the JSON extractor.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// No `{` anywhere in the response text.
    #[error("no JSON object found in response text")]
    NoObject,

    /// Strict parse, trailing-comma repair, and truncation repair all failed.
    #[error("JSON object could not be repaired: {0}")]
    Unrepairable(String),
}
