//! CLI argument definitions and parsing structures

use clap::{ArgGroup, Parser};

/// oemsched - OEM maintenance schedule extraction pipeline
#[derive(Parser, Debug)]
#[command(name = "oemsched")]
#[command(about = "Extract OEM maintenance schedules for pending powertrain configs via Gemini")]
#[command(long_about = r#"
oemsched walks the vehicle taxonomy for pending powertrain configurations,
asks Gemini for each one's factory maintenance schedule, validates the
response, and loads it into the schedule database.

EXAMPLES:
  # Extract schedules for every pending Volvo config
  oemsched --make VOLVO

  # Preview the prompts without calling the API or writing anything
  oemsched --make VOLVO --dry-run

  # Process a single config end to end
  oemsched --make VOLVO --limit 1

  # Work through the whole backlog
  oemsched --all

ENVIRONMENT:
  DATABASE_URL                         schedule database DSN (required)
  GOOGLE_AI_API_KEY / GEMINI_API_KEY   Gemini credential (one required)
  GEMINI_MODEL                         model id (default gemini-2.0-flash)
  OEMSCHED_RATE_LIMIT_SECS             sleep between API calls (default 1.5)
  OEMSCHED_FUZZY_THRESHOLD             item-match threshold (default 0.80)

Per-config failures are caught, logged to the ingestion log, and do not
affect the exit code; the process exits 1 only when it cannot start.
"#)]
#[command(version)]
#[command(group(ArgGroup::new("scope").required(true).args(["make", "all"])))]
pub struct Cli {
    /// Process only configs whose make equals NAME (case-insensitive)
    #[arg(long, value_name = "NAME")]
    pub make: Option<String>,

    /// Process every pending config
    #[arg(long)]
    pub all: bool,

    /// Build prompts; skip the LLM call and all persistence
    #[arg(long)]
    pub dry_run: bool,

    /// Process at most N configs
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
