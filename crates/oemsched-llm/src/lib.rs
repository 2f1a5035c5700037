//! Gemini HTTP backend for the extraction pipeline.
//!
//! Two retry envelopes wrap every call. The inner transport loop
//! ([`http_client`]) retries HTTP 429/500/503 with exponential backoff; the
//! outer parse loop ([`GeminiClient::generate`]) re-issues the entire
//! request once when a 200 response fails JSON extraction. Failures are
//! terminal after that; this crate does not log terminal outcomes; the
//! pipeline driver owns the ingestion log.

mod gemini;
pub(crate) mod http_client;

pub use gemini::{GeminiClient, LlmExtraction};
pub use oemsched_utils::error::LlmError;
