//! Bench runner - drives a dispatcher with concurrent producers.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bytes::Bytes;
use contracts::{BatchProcessor, BenchProfile, LoadProfile, SchedulerKind};
use dispatcher::{BatchingDispatcher, DispatcherBuilder, Scheduler, ThreadScheduler, TokioScheduler};
use tracing::{debug, info, warn};

use super::{BenchItem, BenchStats, CheckingProcessor};

/// Runner configuration
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Effective profile (file + CLI overrides)
    pub profile: BenchProfile,

    /// Upper bound on waiting for idle (None = wait forever)
    pub idle_timeout: Option<Duration>,
}

/// Bench runner
pub struct BenchRunner {
    config: BenchConfig,
}

impl BenchRunner {
    pub fn new(config: BenchConfig) -> Self {
        Self { config }
    }

    /// Build the dispatcher and its scheduler
    ///
    /// Must be called inside a tokio runtime when the profile selects the
    /// tokio scheduler.
    pub fn build(
        &self,
    ) -> Result<(Arc<BatchingDispatcher<BenchItem>>, Arc<CheckingProcessor>)> {
        let profile = &self.config.profile;
        let name = profile.dispatcher.name.clone();

        let scheduler: Arc<dyn Scheduler> = match profile.scheduler {
            SchedulerKind::Thread => Arc::new(
                ThreadScheduler::new(name.clone()).context("Failed to start flush thread")?,
            ),
            SchedulerKind::Tokio => Arc::new(
                TokioScheduler::current(name.clone())
                    .context("Tokio scheduler requires a running runtime")?,
            ),
        };

        let processor = Arc::new(CheckingProcessor::new(
            profile.dispatcher.capacity,
            profile.load.producers,
            profile.processor.clone(),
        ));
        let sink = Arc::clone(&processor);

        let dispatcher = DispatcherBuilder::new(profile.dispatcher.clone())
            .scheduler(scheduler)
            .build(move |batch: Vec<BenchItem>| sink.process(batch))
            .context("Failed to build dispatcher")?;

        Ok((Arc::new(dispatcher), processor))
    }

    /// Run the profile to completion on the calling thread
    ///
    /// Blocks; call from `spawn_blocking` when inside a runtime.
    pub fn drive(
        &self,
        dispatcher: &Arc<BatchingDispatcher<BenchItem>>,
        processor: &CheckingProcessor,
    ) -> Result<BenchStats> {
        let profile = &self.config.profile;
        let load = &profile.load;
        let started = Instant::now();

        info!(
            dispatcher = %dispatcher.name(),
            capacity = dispatcher.capacity(),
            delay_ms = dispatcher.delay().as_millis() as u64,
            scheduler = ?profile.scheduler,
            producers = load.producers,
            items = load.total_items(),
            "Starting bench run"
        );

        let produced = thread::scope(|scope| -> Result<usize> {
            let handles: Vec<_> = (0..load.producers)
                .map(|producer| {
                    let dispatcher = Arc::clone(dispatcher);
                    thread::Builder::new()
                        .name(format!("producer-{producer}"))
                        .spawn_scoped(scope, move || produce(&dispatcher, producer, load))
                })
                .collect::<std::io::Result<_>>()
                .context("Failed to spawn producer thread")?;

            let mut produced = 0;
            for handle in handles {
                produced += handle
                    .join()
                    .map_err(|_| anyhow::anyhow!("producer thread panicked"))??;
            }
            Ok(produced)
        })?;

        let submitted_in = started.elapsed();
        debug!(produced, elapsed_ms = submitted_in.as_millis() as u64, "Producers finished");

        let idle = match self.config.idle_timeout {
            Some(timeout) => dispatcher.await_idle_timeout(timeout),
            None => {
                dispatcher.await_idle();
                true
            }
        };
        if !idle {
            warn!(
                pending = dispatcher.pending_count(),
                "Timed out waiting for dispatcher to go idle"
            );
        }

        Ok(BenchStats {
            expected_items: load.total_items(),
            produced_items: produced,
            delivered_items: processor.received(),
            payload_bytes: processor.payload_bytes(),
            order_violations: processor.order_violations(),
            oversized_batches: processor.oversized_batches(),
            capacity: dispatcher.capacity(),
            reached_idle: idle,
            submit_duration: submitted_in,
            duration: started.elapsed(),
            snapshot: dispatcher.metrics().snapshot(),
            flush_stats: processor.stats(),
        })
    }
}

/// One producer thread; returns the number of items it enqueued
fn produce(
    dispatcher: &BatchingDispatcher<BenchItem>,
    producer: usize,
    load: &LoadProfile,
) -> Result<usize> {
    let payload = Bytes::from(vec![producer as u8; load.payload_bytes]);
    let interval = Duration::from_millis(load.interval_ms);
    let mut seq = 0;

    while seq < load.items_per_producer {
        if dispatcher.is_stopped() {
            warn!(producer, seq, "Dispatcher stopped, producer exiting early");
            break;
        }

        let end = (seq + load.chunk_size).min(load.items_per_producer);
        let now = Instant::now();
        let chunk = (seq..end).map(|seq| BenchItem {
            producer,
            seq,
            submitted_at: now,
            payload: payload.clone(),
        });
        dispatcher
            .enqueue_many(chunk)
            .with_context(|| format!("producer {producer} failed to enqueue"))?;
        seq = end;

        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }
    Ok(seq)
}
