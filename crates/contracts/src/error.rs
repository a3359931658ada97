//! Layered error definitions
//!
//! Categorized by source: config / processor / scheduler

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Processor Errors =====
    /// Batch processor rejected a batch
    #[error("processor failed on batch of {batch_size}: {message}")]
    Processor { batch_size: usize, message: String },

    /// Downstream consumer of a processor went away
    #[error("processor '{name}' is closed")]
    ProcessorClosed { name: String },

    // ===== Scheduler Errors =====
    /// Scheduling facility could not accept a task
    #[error("scheduler error: {message}")]
    Scheduler { message: String },

    /// Scheduled task panicked
    #[error("task panicked: {message}")]
    TaskPanicked { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create processor error
    pub fn processor(batch_size: usize, message: impl Into<String>) -> Self {
        Self::Processor {
            batch_size,
            message: message.into(),
        }
    }

    /// Create scheduler error
    pub fn scheduler(message: impl Into<String>) -> Self {
        Self::Scheduler {
            message: message.into(),
        }
    }

    /// Create task panic error from a panic payload
    pub fn task_panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::TaskPanicked { message }
    }
}
