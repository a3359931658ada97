//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Profile file not found
    #[error("Profile not found: {path}")]
    ConfigNotFound { path: String },

    /// Profile failed validation after overrides
    #[error("Profile validation failed: {message}")]
    ConfigValidation { message: String },

    /// Bench run did not deliver every item
    #[error("Bench run incomplete: {delivered} of {expected} items delivered, {violations} order violations")]
    Incomplete {
        expected: usize,
        delivered: usize,
        violations: usize,
    },

    /// Background bench task failed to join
    #[error("Bench task failed: {message}")]
    BenchTask { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    pub fn bench_task(message: impl Into<String>) -> Self {
        Self::BenchTask {
            message: message.into(),
        }
    }
}
