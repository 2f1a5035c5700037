//! CLI entry point and dispatch logic
//!
//! This module owns the `run()` function which:
//! - Parses CLI arguments
//! - Loads configuration from the environment
//! - Creates the tokio runtime
//! - Drives the pipeline
//! - Handles all error output
//!
//! Exit codes: 0 on normal completion (per-config errors included, they are
//! caught and logged), 1 on argument errors, missing credentials, or any
//! bootstrap failure.

use clap::Parser;
use clap::error::ErrorKind;
use tracing::warn;

use crate::{Config, ExitCode, Pipeline, RunOptions};

use super::args::Cli;

/// Main CLI execution function.
///
/// Handles ALL output including errors; main.rs only maps the returned
/// `ExitCode` to `std::process::exit`.
///
/// # Errors
///
/// Returns the exit code to terminate with on startup failure.
pub fn run() -> Result<(), ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            return Ok(());
        }
        Err(err) => {
            let _ = err.print();
            return Err(ExitCode::STARTUP_FAILURE);
        }
    };

    if let Err(e) = oemsched_utils::logging::init_tracing(cli.verbose) {
        eprintln!("warning: failed to initialize logging: {e}");
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("✗ {err}");
            return Err(err.to_exit_code());
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ failed to create async runtime: {e}");
            return Err(ExitCode::STARTUP_FAILURE);
        }
    };

    let opts = RunOptions {
        make: cli.make,
        all: cli.all,
        dry_run: cli.dry_run,
        limit: cli.limit,
    };

    let result = rt.block_on(async {
        let mut pipeline = Pipeline::bootstrap(config).await?;
        pipeline.run(&opts).await
    });

    match result {
        Ok(summary) => {
            if summary.rejected > 0 {
                warn!(
                    rejected = summary.rejected,
                    "run finished with rejected configs; they remain pending"
                );
            }
            println!(
                "processed {} config(s): {} loaded ({} duplicate), {} flagged, {} rejected",
                summary.processed,
                summary.loaded,
                summary.duplicates,
                summary.flagged,
                summary.rejected
            );
            Ok(())
        }
        Err(err) => {
            eprintln!("✗ {err}");
            Err(ExitCode::STARTUP_FAILURE)
        }
    }
}
