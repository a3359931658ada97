//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Rejected construction arguments
    #[error("invalid dispatcher config: {0}")]
    InvalidConfig(#[source] contracts::ContractError),

    /// Scheduling facility refused a flush
    #[error("dispatcher '{name}' could not schedule flush: {message}")]
    Scheduler { name: String, message: String },

    /// Processor failed during an explicit drain
    #[error("dispatcher '{name}' processor failed: {source}")]
    Processor {
        name: String,
        #[source]
        source: contracts::ContractError,
    },

    /// Contract error
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    /// Create a scheduler error
    pub fn scheduler(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Scheduler {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a processor error
    pub fn processor(name: impl Into<String>, source: contracts::ContractError) -> Self {
        Self::Processor {
            name: name.into(),
            source,
        }
    }
}
