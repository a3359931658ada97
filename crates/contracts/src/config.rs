//! Dispatcher configuration contracts that can be shared across crates.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ContractError;

/// Batching dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BatcherConfig {
    /// Dispatcher name (used for logging/metrics)
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,

    /// Maximum items per delivered batch
    #[validate(range(min = 1, message = "capacity must be >= 1"))]
    pub capacity: usize,

    /// Minimum spacing between flushes under load, in whole milliseconds
    pub delay_ms: u64,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            name: "batcher".to_string(),
            capacity: 100,
            delay_ms: 500,
        }
    }
}

impl BatcherConfig {
    /// Create a config with the given capacity and delay
    ///
    /// The delay is kept at millisecond precision: a fractional millisecond
    /// rounds up so the spacing is never shorter than requested, and
    /// delays beyond `u64::MAX` milliseconds saturate.
    pub fn new(name: impl Into<String>, capacity: usize, delay: Duration) -> Self {
        Self {
            name: name.into(),
            capacity,
            delay_ms: whole_millis(delay),
        }
    }

    /// Flush spacing as a `Duration`
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Validate field constraints
    ///
    /// Reports the first offending field.
    pub fn check(&self) -> Result<(), ContractError> {
        Validate::validate(self).map_err(|errors| {
            let (field, message) = errors
                .field_errors()
                .into_iter()
                .next()
                .map(|(field, errs)| {
                    let message = errs
                        .first()
                        .and_then(|e| e.message.as_ref())
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "invalid value".to_string());
                    (field.to_string(), message)
                })
                .unwrap_or_else(|| ("dispatcher".to_string(), errors.to_string()));
            ContractError::config_validation(field, message)
        })
    }
}

fn whole_millis(delay: Duration) -> u64 {
    let millis = delay.as_millis() + u128::from(delay.subsec_nanos() % 1_000_000 != 0);
    u64::try_from(millis).unwrap_or(u64::MAX)
}

/// Which scheduling facility drives the dispatcher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    /// Dedicated worker thread
    #[default]
    Thread,
    /// Tokio runtime timers + blocking pool
    Tokio,
}
