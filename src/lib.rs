//! LLM-driven OEM maintenance-schedule extraction pipeline.
//!
//! For every unique vehicle powertrain configuration in the taxonomy the
//! pipeline synthesizes a prompt, obtains a JSON response from Gemini,
//! repairs and parses it, reconciles extracted items against the canonical
//! item taxonomy, validates intervals against a rule base, and persists the
//! result transactionally while updating per-vehicle progress state.
//!
//! The crates under `crates/` each own one concern; this crate is the CLI
//! facade that wires them together.

pub mod cli;

pub use oemsched_config::Config;
pub use oemsched_engine::{Pipeline, PipelineError, RunOptions, RunSummary};
pub use oemsched_utils::exit_codes::ExitCode;
