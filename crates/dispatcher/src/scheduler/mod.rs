//! Scheduling facilities
//!
//! Contains ThreadScheduler (dedicated worker thread) and TokioScheduler
//! (runtime timers, blocking pool for the task body).

mod runtime;
mod threaded;

use std::sync::Arc;

use contracts::{ContractError, ErrorHook};
use tracing::error;

pub use self::threaded::ThreadScheduler;
pub use self::runtime::TokioScheduler;

/// Error hook that logs task failures through tracing
pub fn log_error_hook(scheduler: impl Into<String>) -> ErrorHook {
    let scheduler = scheduler.into();
    Arc::new(move |e: &ContractError| {
        error!(scheduler = %scheduler, error = %e, "Scheduled task failed");
    })
}
