//! Scheduler trait - delayed task execution facility
//!
//! The dispatcher borrows a scheduler to run its flushes. Implementations
//! live in the `dispatcher` crate (dedicated thread, tokio runtime).

use std::time::Duration;

use crate::ContractError;

/// Unit of work handed to a scheduler
///
/// An `Err` result is a failure to surface on the facility's error channel.
pub type Task = Box<dyn FnOnce() -> Result<(), ContractError> + Send + 'static>;

/// Hook receiving task failures (returned errors and panics)
pub type ErrorHook = std::sync::Arc<dyn Fn(&ContractError) + Send + Sync + 'static>;

/// Delayed-task facility
pub trait Scheduler: Send + Sync + 'static {
    /// Facility name (used for logging)
    fn name(&self) -> &str;

    /// Run `task` once after `delay`
    ///
    /// Must never run the task on the calling thread.
    ///
    /// # Errors
    /// Returns an error if the facility is shut down or cannot spawn.
    fn schedule(&self, delay: Duration, task: Task) -> Result<Box<dyn ScheduledTask>, ContractError>;
}

/// Handle to a scheduled task
pub trait ScheduledTask: Send + Sync {
    /// Cancel the task if it has not started yet; no-op otherwise
    fn cancel(&self);
}
