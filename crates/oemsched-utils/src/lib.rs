pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod similarity;

pub use error::{ConfigError, ExtractError, LlmError};
pub use exit_codes::ExitCode;
