//! BatchingDispatcher - ordered, size-bounded, rate-limited batch delivery
//!
//! Producers append to a shared inbox from any thread; a borrowed scheduler
//! runs flushes that hand at most `capacity` items to the processor.
//!
//! Scheduling is a debounce/rate-limit hybrid: after an idle period of at
//! least `delay` the next flush is scheduled immediately, otherwise it waits
//! out the rest of the window since the previous flush. A full inbox always
//! flushes immediately.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use contracts::{BatchProcessor, BatcherConfig, ContractError, Scheduler, Task};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::error::DispatcherError;
use crate::handle::PendingFlush;
use crate::metrics::DispatcherMetrics;
use crate::scheduler::ThreadScheduler;

/// How long the next flush should wait
///
/// `last_flush_at == None` means no flush has completed yet, which counts as
/// infinitely long ago.
pub fn desired_delay(
    pending: usize,
    capacity: usize,
    delay: Duration,
    last_flush_at: Option<Instant>,
    now: Instant,
) -> Duration {
    if pending >= capacity {
        return Duration::ZERO;
    }
    match last_flush_at {
        None => Duration::ZERO,
        Some(last) => delay.saturating_sub(now.saturating_duration_since(last)),
    }
}

/// Builder for creating a BatchingDispatcher
pub struct DispatcherBuilder {
    config: BatcherConfig,
    scheduler: Option<Arc<dyn Scheduler>>,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(config: BatcherConfig) -> Self {
        Self {
            config,
            scheduler: None,
        }
    }

    /// Run flushes on `scheduler` instead of a dedicated thread
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Validate the config and build the dispatcher
    ///
    /// # Errors
    /// - capacity 0 or empty name
    /// - the default scheduler thread cannot be spawned
    #[instrument(
        name = "dispatcher_builder_build",
        skip_all,
        fields(dispatcher = %self.config.name)
    )]
    pub fn build<T, P>(self, processor: P) -> Result<BatchingDispatcher<T>, DispatcherError>
    where
        T: Send + 'static,
        P: BatchProcessor<T>,
    {
        self.config.check().map_err(DispatcherError::InvalidConfig)?;

        let scheduler: Arc<dyn Scheduler> = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Arc::new(ThreadScheduler::new(self.config.name.clone())?),
        };

        info!(
            dispatcher = %self.config.name,
            capacity = self.config.capacity,
            delay_ms = self.config.delay_ms,
            scheduler = scheduler.name(),
            "Dispatcher created"
        );

        Ok(BatchingDispatcher {
            shared: Arc::new(Shared {
                delay: self.config.delay(),
                capacity: self.config.capacity,
                name: self.config.name,
                processor: Box::new(processor),
                scheduler,
                state: Mutex::new(State {
                    inbox: VecDeque::new(),
                    last_flush_at: None,
                    pending: None,
                    flushing: false,
                    stopped: false,
                    next_flush_id: 0,
                }),
                idle: Condvar::new(),
                metrics: Arc::new(DispatcherMetrics::new()),
            }),
        })
    }
}

/// Inbox plus scheduling bookkeeping, always mutated under one lock
struct State<T> {
    inbox: VecDeque<T>,
    /// End of the most recent flush
    last_flush_at: Option<Instant>,
    pending: Option<PendingFlush>,
    /// A batch is out with the processor
    flushing: bool,
    stopped: bool,
    next_flush_id: u64,
}

impl<T> State<T> {
    fn is_idle(&self) -> bool {
        !self.flushing && self.pending.is_none() && (self.inbox.is_empty() || self.stopped)
    }
}

struct Shared<T> {
    name: String,
    capacity: usize,
    delay: Duration,
    processor: Box<dyn BatchProcessor<T>>,
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<State<T>>,
    idle: Condvar,
    metrics: Arc<DispatcherMetrics>,
}

impl<T: Send + 'static> Shared<T> {
    fn lock_state(&self) -> MutexGuard<'_, State<T>> {
        // Never held across processor or producer code, so a poisoned lock
        // still guards consistent state
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reschedule decision; runs after every enqueue and every flush
    fn reschedule(self: &Arc<Self>, state: &mut State<T>) -> Result<(), DispatcherError> {
        // An in-flight flush re-runs the decision when it completes
        if state.stopped || state.flushing || state.inbox.is_empty() {
            return Ok(());
        }

        let now = Instant::now();
        let wait = desired_delay(
            state.inbox.len(),
            self.capacity,
            self.delay,
            state.last_flush_at,
            now,
        );
        let deadline = now + wait;

        if let Some(pending) = state.pending.take() {
            if pending.deadline() <= deadline {
                trace!(
                    dispatcher = %self.name,
                    flush_id = pending.id(),
                    remaining_ms = pending.remaining(now).as_millis() as u64,
                    "Pending flush already soon enough"
                );
                state.pending = Some(pending);
                return Ok(());
            }
            pending.cancel();
            self.metrics.inc_reschedule_count();
            observability::record_reschedule(&self.name);
        }

        let id = state.next_flush_id;
        state.next_flush_id += 1;

        let weak = Arc::downgrade(self);
        let task: Task = Box::new(move || match weak.upgrade() {
            Some(shared) => shared.run_flush(id),
            None => Ok(()),
        });

        match self.scheduler.schedule(wait, task) {
            Ok(handle) => {
                debug!(
                    dispatcher = %self.name,
                    flush_id = id,
                    wait_ms = wait.as_millis() as u64,
                    pending = state.inbox.len(),
                    "Flush scheduled"
                );
                state.pending = Some(PendingFlush::new(id, deadline, handle));
                Ok(())
            }
            Err(e) => {
                // Nothing can ever flush again; release await_idle callers
                state.stopped = true;
                self.idle.notify_all();
                error!(
                    dispatcher = %self.name,
                    error = %e,
                    "Scheduler rejected flush, dispatcher stopped"
                );
                Err(DispatcherError::scheduler(&self.name, e.to_string()))
            }
        }
    }

    /// Body of a scheduled flush
    fn run_flush(self: &Arc<Self>, id: u64) -> Result<(), ContractError> {
        let batch = {
            let mut state = self.lock_state();
            if state.pending.as_ref().map(PendingFlush::id) != Some(id) {
                trace!(dispatcher = %self.name, flush_id = id, "Stale flush ignored");
                return Ok(());
            }
            state.pending = None;

            if state.stopped || state.flushing || state.inbox.is_empty() {
                self.idle.notify_all();
                return Ok(());
            }
            self.take_batch(&mut state, self.capacity)
        };

        let _guard = FlushGuard {
            shared: self,
            reschedule: true,
        };
        self.deliver(batch)
    }

    /// Remove up to `limit` items from the head and mark a flush in flight
    fn take_batch(&self, state: &mut State<T>, limit: usize) -> Vec<T> {
        let n = limit.min(state.inbox.len());
        state.flushing = true;
        let batch: Vec<T> = state.inbox.drain(..n).collect();
        self.metrics.set_inbox_len(state.inbox.len());
        observability::record_inbox_depth(&self.name, state.inbox.len());
        batch
    }

    /// Hand one batch to the processor; runs without the state lock
    fn deliver(&self, batch: Vec<T>) -> Result<(), ContractError> {
        let batch_size = batch.len();
        let started = Instant::now();
        self.metrics.record_flush(batch_size);

        let result = self.processor.process(batch);
        let elapsed = started.elapsed();
        observability::record_flush(&self.name, batch_size, elapsed, result.is_ok());

        match &result {
            Ok(()) => debug!(
                dispatcher = %self.name,
                batch_size,
                elapsed_us = elapsed.as_micros() as u64,
                "Batch delivered"
            ),
            Err(e) => {
                self.metrics.inc_failure_count();
                error!(
                    dispatcher = %self.name,
                    batch_size,
                    error = %e,
                    "Processor failed"
                );
            }
        }
        result
    }
}

/// Completes flush bookkeeping, including when the processor panics
struct FlushGuard<'a, T: Send + 'static> {
    shared: &'a Arc<Shared<T>>,
    reschedule: bool,
}

impl<T: Send + 'static> Drop for FlushGuard<'_, T> {
    fn drop(&mut self) {
        let shared = self.shared;
        let mut state = shared.lock_state();

        if std::thread::panicking() {
            shared.metrics.inc_failure_count();
            error!(dispatcher = %shared.name, "Processor panicked");
        }

        state.flushing = false;
        state.last_flush_at = Some(Instant::now());
        if self.reschedule {
            // Failure already logged; the dispatcher is stopped
            let _ = shared.reschedule(&mut state);
        }
        shared.idle.notify_all();
    }
}

/// Batching dispatcher
///
/// Share it between producer threads behind an `Arc`. Dropping it stops it.
pub struct BatchingDispatcher<T: Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> BatchingDispatcher<T> {
    /// Create a dispatcher running on `scheduler`
    pub fn new<P>(
        config: BatcherConfig,
        scheduler: Arc<dyn Scheduler>,
        processor: P,
    ) -> Result<Self, DispatcherError>
    where
        P: BatchProcessor<T>,
    {
        DispatcherBuilder::new(config)
            .scheduler(scheduler)
            .build(processor)
    }

    /// Dispatcher name
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Maximum items per batch
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Minimum spacing between flushes under load
    pub fn delay(&self) -> Duration {
        self.shared.delay
    }

    /// Shared counters
    pub fn metrics(&self) -> &Arc<DispatcherMetrics> {
        &self.shared.metrics
    }

    /// Append one item
    pub fn enqueue(&self, item: T) -> Result<(), DispatcherError> {
        self.enqueue_many(std::iter::once(item))
    }

    /// Append items in order as one atomic step, then run the reschedule decision
    ///
    /// Never waits for a flush. Empty input is a no-op. After `stop` the
    /// items are kept for `flush_all` but nothing is scheduled.
    ///
    /// # Errors
    /// Returns an error if the scheduler refuses the flush; the dispatcher
    /// is stopped in that case and the items remain in the inbox.
    pub fn enqueue_many<I>(&self, items: I) -> Result<(), DispatcherError>
    where
        I: IntoIterator<Item = T>,
    {
        // Drain the caller's iterator before taking the lock
        let items: Vec<T> = items.into_iter().collect();
        if items.is_empty() {
            return Ok(());
        }
        let added = items.len();

        let mut state = self.shared.lock_state();
        state.inbox.extend(items);
        let pending = state.inbox.len();
        self.shared.metrics.add_enqueued(added);
        self.shared.metrics.set_inbox_len(pending);
        observability::record_enqueued(&self.shared.name, added);
        observability::record_inbox_depth(&self.shared.name, pending);

        if state.stopped {
            warn!(
                dispatcher = %self.shared.name,
                added,
                pending,
                "Enqueue on stopped dispatcher, items held until flush_all"
            );
            return Ok(());
        }

        trace!(dispatcher = %self.shared.name, added, pending, "Items enqueued");
        self.shared.reschedule(&mut state)
    }

    /// Items waiting in the inbox (advisory)
    pub fn pending_count(&self) -> usize {
        self.shared.lock_state().inbox.len()
    }

    /// Whether `stop` has been called
    pub fn is_stopped(&self) -> bool {
        self.shared.lock_state().stopped
    }

    /// Block until nothing is scheduled or running and the inbox is empty
    ///
    /// Once stopped, returns as soon as no flush is running. Must not be
    /// called from inside the processor.
    pub fn await_idle(&self) {
        let state = self.shared.lock_state();
        let _state = self
            .shared
            .idle
            .wait_while(state, |s| !s.is_idle())
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// `await_idle` with an upper bound; returns `false` on timeout
    pub fn await_idle_timeout(&self, timeout: Duration) -> bool {
        let state = self.shared.lock_state();
        let (_state, result) = self
            .shared
            .idle
            .wait_timeout_while(state, timeout, |s| !s.is_idle())
            .unwrap_or_else(PoisonError::into_inner);
        !result.timed_out()
    }

    /// Deliver everything currently in the inbox on the caller's thread
    ///
    /// Cancels the pending flush, waits out an in-flight one, then delivers
    /// in capacity-sized batches. Works after `stop`. Every batch is
    /// attempted; the first processor error is returned at the end.
    #[instrument(name = "dispatcher_flush_all", skip(self), fields(dispatcher = %self.shared.name))]
    pub fn flush_all(&self) -> Result<usize, DispatcherError> {
        let shared = &self.shared;
        let mut state = shared.lock_state();
        let mut remaining = state.inbox.len();
        let mut delivered = 0;
        let mut first_error = None;

        while remaining > 0 {
            state = shared
                .idle
                .wait_while(state, |s| s.flushing)
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(pending) = state.pending.take() {
                pending.cancel();
            }

            let limit = remaining.min(shared.capacity);
            let batch = shared.take_batch(&mut state, limit);
            if batch.is_empty() {
                state.flushing = false;
                break;
            }
            remaining -= batch.len();
            delivered += batch.len();
            drop(state);

            let result = {
                let _guard = FlushGuard {
                    shared,
                    reschedule: false,
                };
                shared.deliver(batch)
            };
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }

            state = shared.lock_state();
        }

        // Items that arrived during the drain go back to normal pacing
        shared.reschedule(&mut state)?;
        shared.idle.notify_all();
        drop(state);

        info!(dispatcher = %shared.name, delivered, "Explicit drain complete");
        match first_error {
            Some(e) => Err(DispatcherError::processor(&shared.name, e)),
            None => Ok(delivered),
        }
    }

    /// Discard the inbox without processing; returns the number discarded
    pub fn clear(&self) -> usize {
        let mut state = self.shared.lock_state();
        let discarded = state.inbox.len();
        state.inbox.clear();
        if let Some(pending) = state.pending.take() {
            pending.cancel();
        }
        self.shared.metrics.set_inbox_len(0);
        observability::record_inbox_depth(&self.shared.name, 0);
        self.shared.idle.notify_all();
        debug!(dispatcher = %self.shared.name, discarded, "Inbox cleared");
        discarded
    }

    /// Cancel any pending flush; no further flushes are scheduled
    ///
    /// Items still in the inbox stay there (see `flush_all`).
    pub fn stop(&self) {
        let mut state = self.shared.lock_state();
        if state.stopped {
            return;
        }
        state.stopped = true;
        if let Some(pending) = state.pending.take() {
            pending.cancel();
        }
        self.shared.idle.notify_all();
        info!(
            dispatcher = %self.shared.name,
            pending = state.inbox.len(),
            "Dispatcher stopped"
        );
    }
}

impl<T: Send + 'static> Drop for BatchingDispatcher<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<T: Send + 'static> std::fmt::Debug for BatchingDispatcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchingDispatcher")
            .field("name", &self.shared.name)
            .field("capacity", &self.shared.capacity)
            .field("delay", &self.shared.delay)
            .field("metrics", &self.shared.metrics.snapshot())
            .finish()
    }
}
