// crates/evoseal-config/src/error.rs
// ============================================================================
// Module: Config Errors
// Description: Failure modes for configuration loading and validation.
// Purpose: Let callers distinguish bad input from I/O failure.
// Dependencies: evoseal-core
// ============================================================================

use evoseal_core::ErrorClass;
use evoseal_core::ErrorKind;

/// Configuration loading or validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O failure while reading the configuration file.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ErrorClass for ConfigError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}
