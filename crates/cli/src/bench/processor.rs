//! Processor that simulates work and checks delivery guarantees.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use contracts::{BatchProcessor, ContractError, ProcessorProfile};
use observability::FlushStatsAggregator;
use tracing::{debug, warn};

/// One submitted item
#[derive(Debug, Clone)]
pub struct BenchItem {
    pub producer: usize,
    pub seq: usize,
    pub submitted_at: Instant,
    pub payload: Bytes,
}

/// Counts what it receives and verifies per-producer ordering
///
/// A producer's items must arrive with strictly increasing `seq`, and no
/// batch may exceed `capacity`.
#[derive(Debug)]
pub struct CheckingProcessor {
    capacity: usize,
    profile: ProcessorProfile,
    invocations: AtomicU64,
    received: AtomicUsize,
    payload_bytes: AtomicUsize,
    order_violations: AtomicUsize,
    oversized_batches: AtomicUsize,
    /// Last seq seen per producer
    last_seq: Mutex<Vec<Option<usize>>>,
    stats: Mutex<FlushStatsAggregator>,
}

impl CheckingProcessor {
    pub fn new(capacity: usize, producers: usize, profile: ProcessorProfile) -> Self {
        Self {
            capacity,
            profile,
            invocations: AtomicU64::new(0),
            received: AtomicUsize::new(0),
            payload_bytes: AtomicUsize::new(0),
            order_violations: AtomicUsize::new(0),
            oversized_batches: AtomicUsize::new(0),
            last_seq: Mutex::new(vec![None; producers]),
            stats: Mutex::new(FlushStatsAggregator::new()),
        }
    }

    /// Items handed to the processor, failed batches included
    pub fn received(&self) -> usize {
        self.received.load(Ordering::Relaxed)
    }

    pub fn payload_bytes(&self) -> usize {
        self.payload_bytes.load(Ordering::Relaxed)
    }

    pub fn order_violations(&self) -> usize {
        self.order_violations.load(Ordering::Relaxed)
    }

    pub fn oversized_batches(&self) -> usize {
        self.oversized_batches.load(Ordering::Relaxed)
    }

    /// Copy of the flush statistics so far
    pub fn stats(&self) -> FlushStatsAggregator {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn check_order(&self, batch: &[BenchItem]) {
        let mut last_seq = self.last_seq.lock().unwrap_or_else(PoisonError::into_inner);
        for item in batch {
            let Some(slot) = last_seq.get_mut(item.producer) else {
                self.order_violations.fetch_add(1, Ordering::Relaxed);
                continue;
            };
            if slot.is_some_and(|last| item.seq <= last) {
                warn!(
                    producer = item.producer,
                    seq = item.seq,
                    last = ?slot,
                    "Item delivered out of order"
                );
                self.order_violations.fetch_add(1, Ordering::Relaxed);
            }
            *slot = Some(item.seq);
        }
    }
}

impl BatchProcessor<BenchItem> for CheckingProcessor {
    fn process(&self, batch: Vec<BenchItem>) -> Result<(), ContractError> {
        let started = Instant::now();
        let batch_size = batch.len();
        let n = self.invocations.fetch_add(1, Ordering::Relaxed) + 1;

        if batch_size > self.capacity {
            warn!(batch_size, capacity = self.capacity, "Oversized batch");
            self.oversized_batches.fetch_add(1, Ordering::Relaxed);
        }
        self.check_order(&batch);

        if self.profile.work_per_item_us > 0 {
            thread::sleep(Duration::from_micros(
                self.profile.work_per_item_us * batch_size as u64,
            ));
        }

        let delivered_at = Instant::now();
        let bytes: usize = batch.iter().map(|item| item.payload.len()).sum();
        self.received.fetch_add(batch_size, Ordering::Relaxed);
        self.payload_bytes.fetch_add(bytes, Ordering::Relaxed);

        let failed = self.profile.fail_every > 0 && n % self.profile.fail_every == 0;
        {
            let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
            for item in &batch {
                stats.record_latency(delivered_at.duration_since(item.submitted_at));
            }
            stats.record_flush(batch_size, started.elapsed(), !failed);
        }

        debug!(invocation = n, batch_size, "Batch processed");
        if failed {
            return Err(ContractError::processor(batch_size, "simulated failure"));
        }
        Ok(())
    }
}
