//! Bench statistics and report output.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::FlushStatsAggregator;
use serde::Serialize;

/// Statistics from a bench run
#[derive(Debug, Clone)]
pub struct BenchStats {
    /// Items the profile asked for
    pub expected_items: usize,

    /// Items the producers actually enqueued
    pub produced_items: usize,

    /// Items handed to the processor (failed batches included)
    pub delivered_items: usize,

    /// Payload bytes handed to the processor
    pub payload_bytes: usize,

    /// Items seen out of per-producer order
    pub order_violations: usize,

    /// Batches larger than capacity
    pub oversized_batches: usize,

    pub capacity: usize,

    /// Whether the dispatcher reached idle before the timeout
    pub reached_idle: bool,

    /// Time until every producer returned
    pub submit_duration: Duration,

    /// Total duration of the run
    pub duration: Duration,

    /// Dispatcher counters at the end of the run
    pub snapshot: MetricsSnapshot,

    /// Processor-side flush statistics
    pub flush_stats: FlushStatsAggregator,
}

impl BenchStats {
    /// Every produced item delivered exactly once, in order, within capacity
    pub fn is_complete(&self) -> bool {
        self.reached_idle
            && self.produced_items == self.expected_items
            && self.delivered_items == self.produced_items
            && self.order_violations == 0
            && self.oversized_batches == 0
    }

    /// Delivered items per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.delivered_items as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Build a serializable report
    pub fn report(&self) -> BenchReport {
        let summary = self.flush_stats.summary();
        BenchReport {
            complete: self.is_complete(),
            expected_items: self.expected_items,
            produced_items: self.produced_items,
            delivered_items: self.delivered_items,
            payload_bytes: self.payload_bytes,
            order_violations: self.order_violations,
            oversized_batches: self.oversized_batches,
            capacity: self.capacity,
            flushes: self.snapshot.flush_count,
            failed_flushes: self.snapshot.failure_count,
            reschedules: self.snapshot.reschedule_count,
            max_batch_size: self.snapshot.max_batch_size,
            mean_batch_size: summary.batch_size.mean,
            mean_latency_ms: summary.latency_ms.mean,
            max_latency_ms: summary.latency_ms.max,
            duration_secs: self.duration.as_secs_f64(),
            throughput: self.throughput(),
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Bench Statistics ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.3}s", self.duration.as_secs_f64());
        println!("   ├─ Submit time: {:.3}s", self.submit_duration.as_secs_f64());
        println!("   ├─ Items: {} / {}", self.delivered_items, self.expected_items);
        println!("   ├─ Payload: {} bytes", self.payload_bytes);
        println!("   └─ Throughput: {:.1} items/s", self.throughput());

        let snapshot = &self.snapshot;
        println!("\nDispatcher");
        println!("   ├─ Flushes: {}", snapshot.flush_count);
        println!("   ├─ Failed flushes: {}", snapshot.failure_count);
        println!("   ├─ Reschedules: {}", snapshot.reschedule_count);
        println!(
            "   └─ Max batch: {} (capacity {})",
            snapshot.max_batch_size, self.capacity
        );

        println!("\n{}", self.flush_stats.summary());

        println!("Checks");
        println!("   ├─ Reached idle: {}", self.reached_idle);
        println!("   ├─ Order violations: {}", self.order_violations);
        println!("   ├─ Oversized batches: {}", self.oversized_batches);
        println!(
            "   └─ Result: {}",
            if self.is_complete() { "COMPLETE" } else { "INCOMPLETE" }
        );
        println!();
    }
}

/// JSON report
#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub complete: bool,
    pub expected_items: usize,
    pub produced_items: usize,
    pub delivered_items: usize,
    pub payload_bytes: usize,
    pub order_violations: usize,
    pub oversized_batches: usize,
    pub capacity: usize,
    pub flushes: u64,
    pub failed_flushes: u64,
    pub reschedules: u64,
    pub max_batch_size: usize,
    pub mean_batch_size: f64,
    pub mean_latency_ms: f64,
    pub max_latency_ms: f64,
    pub duration_secs: f64,
    pub throughput: f64,
}
