//! Exit code constants for the oemsched CLI.
//!
//! The pipeline deliberately collapses almost everything to success: a run
//! that caught and logged per-config failures still exits 0. Only startup
//! problems the operator must fix before any work can begin (missing
//! credentials, bad arguments, unreachable database) exit non-zero.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Run completed (per-config errors were logged, not fatal) |
//! | 1 | `STARTUP_FAILURE` | Missing credentials, argument errors, or bootstrap failure |

/// Exit codes for `std::process::exit`.
///
/// The numeric values are part of the CLI contract and will not change
/// within a release line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Run completed normally, including runs where individual configs
    /// failed and were recorded in the ingestion log.
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// The process could not start: absent API credential, invalid CLI
    /// arguments, or a failed bootstrap (database unreachable).
    pub const STARTUP_FAILURE: ExitCode = ExitCode(1);

    /// Numeric value for `std::process::exit`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}
