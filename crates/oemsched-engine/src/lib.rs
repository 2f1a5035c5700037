//! The pipeline driver.
//!
//! Per pending config, the driver walks a small state machine:
//!
//! ```text
//! pending ──(LLM OK, ≥1 entry)──▶ extracted          [log: loaded]
//!    │
//!    ├──(LLM OK, 0 entries)─────▶ skipped            [log: flagged]
//!    │
//!    ├──(transport/parse/DB error)▶ pending unchanged [log: rejected]
//! ```
//!
//! Exactly one ingestion-log row is written per run. Configs process in
//! stable `engine_code` order, strictly sequentially, with a fixed sleep
//! between LLM calls; parallelism is achieved by running several processes
//! sharded by make, never inside one process.

use std::time::Instant;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use oemsched_config::Config;
use oemsched_llm::{GeminiClient, LlmError};
use oemsched_model::{ExtractedDocument, IngestionStatus, SourceConfig};
use oemsched_prompt::build_prompt;
use oemsched_store::{
    IngestionRecord, ItemCatalog, Persister, RunMeta, StoreError, append_ingestion_log,
    load_validation_rules, mark_skipped, pending_source_configs,
};
use oemsched_utils::error::ConfigError;
use oemsched_validation::Validator;

/// Fatal pipeline errors: bootstrap failures and anything that prevents the
/// run loop itself from proceeding. Per-config failures never surface here.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Per-config failure, caught by the run loop and logged as a rejection.
#[derive(Error, Debug)]
enum ConfigFailure {
    #[error("{0}")]
    Llm(#[from] LlmError),

    #[error("response decode failed: {reason}")]
    Decode { reason: String, raw: String },

    #[error("{0}")]
    Store(#[from] StoreError),
}

impl ConfigFailure {
    /// Raw response text, when the failure preserved one.
    fn raw_response(&self) -> Option<&str> {
        match self {
            Self::Llm(LlmError::Unparseable { raw, .. }) => Some(raw),
            Self::Decode { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// What one config produced.
enum ConfigOutcome {
    DryRun,
    Loaded {
        schedule_rows: usize,
        fluid_rows: usize,
        duplicate: bool,
    },
    Flagged,
}

/// Run scope selected on the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub make: Option<String>,
    pub all: bool,
    pub dry_run: bool,
    pub limit: Option<usize>,
}

/// End-of-run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub loaded: usize,
    pub flagged: usize,
    pub rejected: usize,
    pub duplicates: usize,
}

/// The pipeline: owns the pool, the LLM client, and the process-lifetime
/// caches (item catalog, validator rules).
pub struct Pipeline {
    config: Config,
    pool: PgPool,
    client: GeminiClient,
    catalog: ItemCatalog,
    validator: Validator,
}

impl Pipeline {
    /// Connect to the store and load the process-lifetime state.
    ///
    /// # Errors
    ///
    /// Any bootstrap failure: unreachable database, catalog or rule load
    /// failure, HTTP client construction.
    pub async fn bootstrap(config: Config) -> Result<Self, PipelineError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&config.database_url)
            .await
            .map_err(StoreError::from)?;

        let rules = load_validation_rules(&pool).await?;
        let validator = Validator::new(rules, config.fuzzy_threshold);
        let catalog = ItemCatalog::load(&pool, config.fuzzy_threshold).await?;
        let client = GeminiClient::new(&config)?;

        info!(
            items = catalog.len(),
            rules = validator.rule_count(),
            model = %config.model,
            "pipeline bootstrapped"
        );

        Ok(Self {
            config,
            pool,
            client,
            catalog,
            validator,
        })
    }

    /// Process every pending config in scope.
    ///
    /// Per-config failures are caught, logged as rejections, and the loop
    /// continues; only store failures around the work queue itself abort.
    ///
    /// # Errors
    ///
    /// A database error while loading the pending work queue.
    pub async fn run(&mut self, opts: &RunOptions) -> Result<RunSummary, PipelineError> {
        let sources =
            pending_source_configs(&self.pool, opts.make.as_deref(), opts.limit).await?;
        info!(
            configs = sources.len(),
            make = opts.make.as_deref().unwrap_or("*"),
            dry_run = opts.dry_run,
            "pending powertrain configs"
        );

        let mut summary = RunSummary::default();
        let total = sources.len();

        for (index, source) in sources.iter().enumerate() {
            summary.processed += 1;
            let started = Instant::now();

            match self.process_config(source, opts.dry_run).await {
                Ok(ConfigOutcome::DryRun) => {}
                Ok(ConfigOutcome::Loaded {
                    schedule_rows,
                    fluid_rows,
                    duplicate,
                }) => {
                    summary.loaded += 1;
                    if duplicate {
                        summary.duplicates += 1;
                    }
                    info!(
                        config = %source.label(),
                        schedule_rows,
                        fluid_rows,
                        duplicate,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "config loaded"
                    );
                }
                Ok(ConfigOutcome::Flagged) => {
                    summary.flagged += 1;
                    warn!(
                        config = %source.label(),
                        "empty schedule, taxonomy skipped"
                    );
                }
                Err(failure) => {
                    summary.rejected += 1;
                    warn!(
                        config = %source.label(),
                        error = %failure,
                        "config rejected"
                    );
                    if let Err(log_err) = self.log_rejection(source, &failure).await {
                        error!(
                            config = %source.label(),
                            error = %log_err,
                            "failed to append rejection to ingestion log"
                        );
                    }
                }
            }

            if !opts.dry_run && index + 1 < total {
                tokio::time::sleep(self.config.rate_limit).await;
            }
        }

        info!(
            processed = summary.processed,
            loaded = summary.loaded,
            flagged = summary.flagged,
            rejected = summary.rejected,
            duplicates = summary.duplicates,
            "run complete"
        );
        Ok(summary)
    }

    async fn process_config(
        &mut self,
        source: &SourceConfig,
        dry_run: bool,
    ) -> Result<ConfigOutcome, ConfigFailure> {
        let prompt = build_prompt(source);

        if dry_run {
            info!(
                config = %source.label(),
                prompt_bytes = prompt.text.len(),
                max_output_tokens = ?prompt.max_output_tokens,
                "dry run: prompt built"
            );
            debug!(prompt = %prompt.text);
            return Ok(ConfigOutcome::DryRun);
        }

        let extraction = self
            .client
            .generate(&prompt.text, prompt.max_output_tokens)
            .await?;

        let doc = ExtractedDocument::from_value(extraction.parsed.clone()).map_err(|e| {
            ConfigFailure::Decode {
                reason: e.to_string(),
                raw: extraction.raw_text.clone(),
            }
        })?;

        if doc.schedule_entries.is_empty() {
            self.flag_empty(source, &prompt.text, &extraction.raw_text)
                .await?;
            return Ok(ConfigOutcome::Flagged);
        }

        let meta = RunMeta {
            prompt: &prompt.text,
            raw_response: &extraction.raw_text,
            model: &self.config.model,
        };
        let mut persister = Persister {
            pool: &self.pool,
            catalog: &mut self.catalog,
            validator: &self.validator,
        };
        let outcome = persister.persist_extraction(source, &doc, &meta).await?;

        for warning in &outcome.warnings {
            warn!(config = %source.label(), warning = %warning, "validation warning");
        }

        Ok(ConfigOutcome::Loaded {
            schedule_rows: outcome.schedule_rows,
            fluid_rows: outcome.fluid_rows,
            duplicate: outcome.config_existed,
        })
    }

    /// Valid response, zero entries: move taxonomy to skipped and log the
    /// run as flagged, in one transaction.
    async fn flag_empty(
        &self,
        source: &SourceConfig,
        prompt: &str,
        raw_response: &str,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        mark_skipped(&mut *tx, &source.taxonomy_ids).await?;
        append_ingestion_log(
            &mut *tx,
            &IngestionRecord {
                make: &source.make,
                model: &source.model,
                engine_code: &source.engine_code,
                transmission_code: None,
                drive_type: source.drive_type.as_deref(),
                model_used: &self.config.model,
                status: IngestionStatus::Flagged,
                prompt,
                raw_response: Some(raw_response),
                schedule_row_count: 0,
                fluid_row_count: 0,
                validation_notes: Some("response contained zero schedule entries".to_string()),
                powertrain_config_id: None,
                is_duplicate: false,
                error_detail: None,
            },
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Append the rejection record in its own transaction, after any main
    /// transaction rolled back. The config stays pending.
    async fn log_rejection(
        &self,
        source: &SourceConfig,
        failure: &ConfigFailure,
    ) -> Result<(), StoreError> {
        // The builder is deterministic, so rebuilding here records exactly
        // the prompt the failed call used.
        let prompt = build_prompt(source);
        append_ingestion_log(
            &self.pool,
            &IngestionRecord {
                make: &source.make,
                model: &source.model,
                engine_code: &source.engine_code,
                transmission_code: None,
                drive_type: source.drive_type.as_deref(),
                model_used: &self.config.model,
                status: IngestionStatus::Rejected,
                prompt: &prompt.text,
                raw_response: failure.raw_response(),
                schedule_row_count: 0,
                fluid_row_count: 0,
                validation_notes: None,
                powertrain_config_id: None,
                is_duplicate: false,
                error_detail: Some(failure.to_string()),
            },
        )
        .await?;
        Ok(())
    }
}
