//! PendingFlush - the one scheduled-but-not-yet-run flush

use std::time::{Duration, Instant};

use contracts::ScheduledTask;

/// Reference to the outstanding scheduled flush
///
/// `id` ties a firing task back to this entry; a firing whose id no longer
/// matches is stale and does nothing.
pub(crate) struct PendingFlush {
    id: u64,
    deadline: Instant,
    task: Box<dyn ScheduledTask>,
}

impl PendingFlush {
    pub(crate) fn new(id: u64, deadline: Instant, task: Box<dyn ScheduledTask>) -> Self {
        Self { id, deadline, task }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the flush fires
    pub(crate) fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    pub(crate) fn cancel(&self) {
        self.task.cancel();
    }
}

impl std::fmt::Debug for PendingFlush {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingFlush")
            .field("id", &self.id)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}
