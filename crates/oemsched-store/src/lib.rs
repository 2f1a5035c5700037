//! Relational persistence for the extraction pipeline.
//!
//! Table layout (created by the schema migrations that seed the taxonomy;
//! this crate only reads and writes):
//!
//! | Table | Role |
//! |-------|------|
//! | `nhtsa_vehicle_taxonomy` | pending work queue; status + config linkage updated here |
//! | `powertrain_configs` | unique on `(engine_code, transmission_code, drive_type)` |
//! | `maintenance_items` | online-learned item taxonomy (name unique, alias array) |
//! | `maintenance_schedules` | one row per (config, item, action) with interval spec |
//! | `fluid_specifications` | unique on (config, fluid_type); upsert-merge by COALESCE |
//! | `vehicle_applications` | (config, make, model, year range, market, paradigm) |
//! | `service_code_systems` / `service_code_definitions` | brand minder-code glossaries |
//! | `validation_rules` | interval bounds loaded once at start |
//! | `gemini_ingestion_log` | append-only audit trail, one row per run |

pub mod catalog;
pub mod dedup;
pub mod log;
pub mod models;
pub mod persist;
pub mod rules;
pub mod taxonomy;

use thiserror::Error;

pub use catalog::ItemCatalog;
pub use dedup::{ConfigResolution, MergedPowertrain, find_or_create_config, merge_powertrain};
pub use log::{IngestionRecord, append_ingestion_log};
pub use persist::{PersistOutcome, Persister, RunMeta};
pub use rules::load_validation_rules;
pub use taxonomy::{mark_skipped, pending_source_configs};

/// Database-layer errors. Everything funnels through `sqlx::Error`; the
/// persister's contract (rollback on any failure) does not need finer
/// variants.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
