//! Command-line interface: argument definitions and the run entrypoint.

mod args;
mod run;

pub use args::Cli;
pub use run::run;
