//! TokioScheduler - runtime timers, task body on the blocking pool

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{ContractError, ErrorHook, ScheduledTask, Scheduler, Task};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::warn;

use super::log_error_hook;

// Task lifecycle, advanced with compare-and-swap
const SPAWNING: u8 = 0;
const SCHEDULED: u8 = 1;
const STARTED: u8 = 2;
const CANCELLED: u8 = 3;
const DROPPED: u8 = 4;

/// Move `state` to `to` if it is currently one of `from`
///
/// Returns the previous state on success, the current one otherwise.
fn advance(state: &AtomicU8, from: &[u8], to: u8) -> Result<u8, u8> {
    state.fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
        from.contains(&s).then_some(to)
    })
}

/// Scheduler backed by a tokio runtime
///
/// Each task sleeps on the runtime timer, then runs on `spawn_blocking`
/// since batch processors are synchronous. Safe to call from threads
/// outside the runtime.
///
/// A runtime that has shut down drops spawned futures without polling
/// them. `schedule` detects this and returns an error; a task dropped
/// later, while waiting on its timer, is reported to the error hook.
#[derive(Clone)]
pub struct TokioScheduler {
    name: String,
    handle: Handle,
    on_error: ErrorHook,
}

impl TokioScheduler {
    /// Create a scheduler on the given runtime
    pub fn new(name: impl Into<String>, handle: Handle) -> Self {
        let name = name.into();
        let on_error = log_error_hook(name.clone());
        Self {
            name,
            handle,
            on_error,
        }
    }

    /// Create a scheduler on the runtime the caller is running in
    ///
    /// # Errors
    /// Fails outside a tokio runtime context.
    pub fn current(name: impl Into<String>) -> Result<Self, ContractError> {
        let handle = Handle::try_current()
            .map_err(|e| ContractError::scheduler(format!("no tokio runtime: {e}")))?;
        Ok(Self::new(name, handle))
    }

    /// Report task failures to `on_error` instead of the log
    pub fn with_error_hook(mut self, on_error: ErrorHook) -> Self {
        self.on_error = on_error;
        self
    }
}

impl Scheduler for TokioScheduler {
    fn name(&self) -> &str {
        &self.name
    }

    fn schedule(
        &self,
        delay: Duration,
        task: Task,
    ) -> Result<Box<dyn ScheduledTask>, ContractError> {
        let state = Arc::new(AtomicU8::new(SPAWNING));
        let guard = DropReporter {
            state: Arc::clone(&state),
            name: self.name.clone(),
            on_error: Arc::clone(&self.on_error),
        };

        let join = self.handle.spawn(async move {
            let guard = guard;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if advance(&guard.state, &[SPAWNING, SCHEDULED], STARTED).is_err() {
                return;
            }
            match tokio::task::spawn_blocking(task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => (guard.on_error)(&e),
                Err(e) if e.is_panic() => {
                    (guard.on_error)(&ContractError::task_panicked(e.into_panic().as_ref()));
                }
                Err(e) => {
                    warn!(scheduler = %guard.name, error = %e, "Blocking task cancelled");
                    (guard.on_error)(&ContractError::scheduler(format!(
                        "scheduler '{}': task cancelled before it ran: {e}",
                        guard.name
                    )));
                }
            }
        });

        // A closed runtime drops the future inside `spawn`
        match advance(&state, &[SPAWNING], SCHEDULED) {
            Err(DROPPED) => Err(ContractError::scheduler(format!(
                "scheduler '{}': tokio runtime is shut down",
                self.name
            ))),
            _ => Ok(Box::new(SpawnedTask {
                abort: join.abort_handle(),
                state,
            })),
        }
    }
}

/// Reports a task future dropped before its body ran
struct DropReporter {
    state: Arc<AtomicU8>,
    name: String,
    on_error: ErrorHook,
}

impl Drop for DropReporter {
    fn drop(&mut self) {
        // Still SPAWNING means `schedule` is about to return the error itself
        if let Ok(SCHEDULED) = advance(&self.state, &[SPAWNING, SCHEDULED], DROPPED) {
            warn!(scheduler = %self.name, "Runtime dropped a scheduled task");
            (self.on_error)(&ContractError::scheduler(format!(
                "scheduler '{}': runtime shut down before task ran",
                self.name
            )));
        }
    }
}

/// Handle to a spawned timer task
struct SpawnedTask {
    abort: AbortHandle,
    state: Arc<AtomicU8>,
}

impl ScheduledTask for SpawnedTask {
    fn cancel(&self) {
        // Once the body is on the blocking pool the abort has no effect
        let _ = advance(&self.state, &[SPAWNING, SCHEDULED], CANCELLED);
        self.abort.abort();
    }
}
