//! Dispatcher metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters for a single dispatcher
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Current inbox length
    inbox_len: AtomicUsize,
    /// Total items accepted by enqueue
    enqueued_count: AtomicU64,
    /// Total items handed to the processor
    delivered_count: AtomicU64,
    /// Total processor invocations
    flush_count: AtomicU64,
    /// Total processor failures (errors and panics)
    failure_count: AtomicU64,
    /// Largest batch delivered so far
    max_batch_size: AtomicUsize,
    /// Pending flushes replaced by an earlier one
    reschedule_count: AtomicU64,
}

impl DispatcherMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current inbox length
    pub fn inbox_len(&self) -> usize {
        self.inbox_len.load(Ordering::Relaxed)
    }

    /// Set current inbox length
    pub fn set_inbox_len(&self, len: usize) {
        self.inbox_len.store(len, Ordering::Relaxed);
    }

    /// Get total enqueued items
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued_count.load(Ordering::Relaxed)
    }

    /// Add to enqueued items
    pub fn add_enqueued(&self, n: usize) {
        self.enqueued_count.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Get total delivered items
    pub fn delivered_count(&self) -> u64 {
        self.delivered_count.load(Ordering::Relaxed)
    }

    /// Get flush count
    pub fn flush_count(&self) -> u64 {
        self.flush_count.load(Ordering::Relaxed)
    }

    /// Record one processor invocation of `batch_size` items
    pub fn record_flush(&self, batch_size: usize) {
        self.flush_count.fetch_add(1, Ordering::Relaxed);
        self.delivered_count
            .fetch_add(batch_size as u64, Ordering::Relaxed);
        self.max_batch_size.fetch_max(batch_size, Ordering::Relaxed);
    }

    /// Get failure count
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Increment failure count
    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get largest delivered batch
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size.load(Ordering::Relaxed)
    }

    /// Get reschedule count
    pub fn reschedule_count(&self) -> u64 {
        self.reschedule_count.load(Ordering::Relaxed)
    }

    /// Increment reschedule count
    pub fn inc_reschedule_count(&self) {
        self.reschedule_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            inbox_len: self.inbox_len(),
            enqueued_count: self.enqueued_count(),
            delivered_count: self.delivered_count(),
            flush_count: self.flush_count(),
            failure_count: self.failure_count(),
            max_batch_size: self.max_batch_size(),
            reschedule_count: self.reschedule_count(),
        }
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub inbox_len: usize,
    pub enqueued_count: u64,
    pub delivered_count: u64,
    pub flush_count: u64,
    pub failure_count: u64,
    pub max_batch_size: usize,
    pub reschedule_count: u64,
}
