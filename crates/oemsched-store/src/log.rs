//! Append-only ingestion audit log.
//!
//! Exactly one row per pipeline invocation, whatever the outcome. Loaded
//! and flagged rows are appended inside the run's transaction; rejections
//! are appended in their own transaction after the rollback, so the audit
//! trail survives the failure it records.

use chrono::Utc;

use oemsched_model::IngestionStatus;

use crate::StoreError;

/// Prompt excerpt cap for log rows.
pub const PROMPT_EXCERPT_BYTES: usize = 2 * 1024;

/// Raw-response excerpt cap for log rows.
pub const RAW_RESPONSE_EXCERPT_BYTES: usize = 10 * 1024;

/// One audit row.
#[derive(Debug, Clone)]
pub struct IngestionRecord<'a> {
    pub make: &'a str,
    pub model: &'a str,
    pub engine_code: &'a str,
    pub transmission_code: Option<&'a str>,
    pub drive_type: Option<&'a str>,
    pub model_used: &'a str,
    pub status: IngestionStatus,
    pub prompt: &'a str,
    pub raw_response: Option<&'a str>,
    pub schedule_row_count: i32,
    pub fluid_row_count: i32,
    pub validation_notes: Option<String>,
    pub powertrain_config_id: Option<i64>,
    pub is_duplicate: bool,
    pub error_detail: Option<String>,
}

/// Append one ingestion-log row, returning its id.
///
/// Prompt and raw response are truncated to their excerpt caps on UTF-8
/// boundaries before insert.
///
/// # Errors
///
/// Any database error.
pub async fn append_ingestion_log(
    executor: impl sqlx::PgExecutor<'_>,
    record: &IngestionRecord<'_>,
) -> Result<i64, StoreError> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO gemini_ingestion_log \
         (make, model, engine_code, transmission_code, drive_type, model_used, status, \
          prompt_excerpt, raw_response_excerpt, schedule_row_count, fluid_row_count, \
          validation_notes, powertrain_config_id, is_duplicate, error_detail, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
         RETURNING id",
    )
    .bind(record.make)
    .bind(record.model)
    .bind(record.engine_code)
    .bind(record.transmission_code)
    .bind(record.drive_type)
    .bind(record.model_used)
    .bind(record.status.as_str())
    .bind(truncate_utf8(record.prompt, PROMPT_EXCERPT_BYTES))
    .bind(
        record
            .raw_response
            .map(|raw| truncate_utf8(raw, RAW_RESPONSE_EXCERPT_BYTES)),
    )
    .bind(record.schedule_row_count)
    .bind(record.fluid_row_count)
    .bind(&record.validation_notes)
    .bind(record.powertrain_config_id)
    .bind(record.is_duplicate)
    .bind(&record.error_detail)
    .bind(Utc::now())
    .fetch_one(executor)
    .await?;
    Ok(id)
}

/// Truncate to at most `max` bytes on a char boundary.
fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
