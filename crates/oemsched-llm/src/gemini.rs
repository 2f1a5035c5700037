//! Gemini `generateContent` backend.
//!
//! Wire contract: POST to
//! `{base}/models/{model}:generateContent?key={api_key}` with
//! `{contents:[{parts:[{text}]}], generationConfig:{maxOutputTokens, temperature}}`;
//! the response carries text at `candidates[].content.parts[].text`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use oemsched_config::Config;
use oemsched_extraction::extract_json;
use oemsched_utils::error::LlmError;

use crate::http_client::HttpClient;

/// Default Gemini API endpoint.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Full-request attempts when a 200 body fails JSON extraction.
const PARSE_ATTEMPTS: u32 = 2;

/// A successfully extracted response: the parsed object plus the raw text
/// it came from (persisted into the ingestion log).
#[derive(Debug, Clone)]
pub struct LlmExtraction {
    pub parsed: Value,
    pub raw_text: String,
}

/// Synchronous-in-spirit Gemini client: one request, one response, no
/// streaming.
pub struct GeminiClient {
    http: HttpClient,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    default_max_tokens: u32,
}

impl GeminiClient {
    /// Build a client from pipeline configuration.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be
    /// constructed.
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        Ok(Self {
            http: HttpClient::new()?,
            endpoint: format!("{DEFAULT_BASE_URL}/models/{}:generateContent", config.model),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            default_max_tokens: config.max_output_tokens,
        })
    }

    /// Request a schedule document, returning the parsed JSON and raw text.
    ///
    /// The outer parse loop re-issues the whole request when extraction
    /// fails despite a successful HTTP exchange; transport errors are
    /// terminal immediately (the inner loop already retried them).
    ///
    /// # Errors
    ///
    /// Any `LlmError`; `LlmError::Unparseable` carries the final raw text.
    pub async fn generate(
        &self,
        prompt: &str,
        max_tokens_override: Option<u32>,
    ) -> Result<LlmExtraction, LlmError> {
        let mut last_failure: Option<LlmError> = None;
        for attempt in 0..PARSE_ATTEMPTS {
            let raw_text = self.request_text(prompt, max_tokens_override).await?;
            match extract_json(&raw_text) {
                Ok(parsed) => {
                    debug!(model = %self.model, attempt, "response extracted");
                    return Ok(LlmExtraction { parsed, raw_text });
                }
                Err(err) => {
                    warn!(
                        model = %self.model,
                        attempt,
                        error = %err,
                        response_bytes = raw_text.len(),
                        "response failed JSON extraction"
                    );
                    last_failure = Some(LlmError::Unparseable {
                        reason: err.to_string(),
                        raw: raw_text,
                    });
                }
            }
        }
        // last_failure is always set: the loop either returned or recorded one
        Err(last_failure.unwrap_or(LlmError::EmptyResponse))
    }

    /// One HTTP exchange under the transport retry policy, yielding the
    /// concatenated candidate text.
    async fn request_text(
        &self,
        prompt: &str,
        max_tokens_override: Option<u32>,
    ) -> Result<String, LlmError> {
        let body = GenerateRequest::new(
            prompt,
            max_tokens_override.unwrap_or(self.default_max_tokens),
            self.temperature,
        );

        let builder = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body);

        let response = self.http.execute_with_retry(builder, "gemini").await?;

        let envelope: GenerateResponse = response.json().await.map_err(|e| {
            LlmError::Transport(format!("failed to decode Gemini response envelope: {e}"))
        })?;

        let text = envelope.joined_text();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }
}

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

impl GenerateRequest {
    fn new(prompt: &str, max_output_tokens: u32, temperature: f32) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens,
                temperature,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    fn joined_text(&self) -> String {
        let mut out = String::new();
        for candidate in &self.candidates {
            if let Some(content) = &candidate.content {
                for part in &content.parts {
                    out.push_str(&part.text);
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<Part>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let body = GenerateRequest::new("extract the schedule", 16_384, 0.1);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "extract the schedule");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 16_384);
        let temp = value["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temp - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_response_text_joining() {
        let envelope: GenerateResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"a\":"}, {"text": " 1}"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(envelope.joined_text(), "{\"a\": 1}");
    }

    #[test]
    fn test_response_without_candidates_is_empty() {
        let envelope: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(envelope.joined_text().is_empty());
    }

    #[test]
    fn test_response_with_empty_content_is_empty() {
        let envelope: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        assert!(envelope.joined_text().is_empty());
    }

    #[test]
    fn test_client_endpoint_includes_model() {
        let config = oemsched_config::Config::minimal_for_testing();
        let client = GeminiClient::new(&config).unwrap();
        assert!(client.endpoint.ends_with("/models/gemini-2.0-flash:generateContent"));
    }
}
