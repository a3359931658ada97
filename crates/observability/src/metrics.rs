//! Dispatcher metric recording
//!
//! Thin wrappers over the `metrics` facade plus an in-memory aggregator
//! used for end-of-run reports.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Record items accepted by `enqueue`
pub fn record_enqueued(dispatcher: &str, count: usize) {
    counter!(
        "batcher_items_enqueued_total",
        "dispatcher" => dispatcher.to_string()
    )
    .increment(count as u64);
}

/// Record one processor invocation
pub fn record_flush(dispatcher: &str, batch_size: usize, elapsed: Duration, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "batcher_flushes_total",
        "dispatcher" => dispatcher.to_string(),
        "status" => status
    )
    .increment(1);
    counter!(
        "batcher_items_delivered_total",
        "dispatcher" => dispatcher.to_string()
    )
    .increment(batch_size as u64);
    histogram!(
        "batcher_batch_size",
        "dispatcher" => dispatcher.to_string()
    )
    .record(batch_size as f64);
    histogram!(
        "batcher_flush_duration_ms",
        "dispatcher" => dispatcher.to_string()
    )
    .record(elapsed.as_secs_f64() * 1000.0);
}

/// Record current inbox depth
pub fn record_inbox_depth(dispatcher: &str, depth: usize) {
    gauge!(
        "batcher_inbox_depth",
        "dispatcher" => dispatcher.to_string()
    )
    .set(depth as f64);
}

/// Record a pending flush replaced by an earlier one
pub fn record_reschedule(dispatcher: &str) {
    counter!(
        "batcher_reschedules_total",
        "dispatcher" => dispatcher.to_string()
    )
    .increment(1);
}

/// Flush statistics aggregator
///
/// Aggregates in memory for summaries; independent of the exporter.
#[derive(Debug, Clone, Default)]
pub struct FlushStatsAggregator {
    /// Processor invocations
    pub total_flushes: u64,

    /// Items delivered
    pub total_items: u64,

    /// Failed invocations
    pub failed_flushes: u64,

    /// Batch size distribution
    pub batch_size_stats: RunningStats,

    /// Enqueue-to-delivery latency (ms)
    pub latency_stats: RunningStats,

    /// Processor time per flush (ms)
    pub flush_time_stats: RunningStats,
}

impl FlushStatsAggregator {
    /// Create a new aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Account one flush
    pub fn record_flush(&mut self, batch_size: usize, flush_time: Duration, success: bool) {
        self.total_flushes += 1;
        self.total_items += batch_size as u64;
        if !success {
            self.failed_flushes += 1;
        }
        self.batch_size_stats.push(batch_size as f64);
        self.flush_time_stats
            .push(flush_time.as_secs_f64() * 1000.0);
    }

    /// Account one item's enqueue-to-delivery latency
    pub fn record_latency(&mut self, latency: Duration) {
        self.latency_stats.push(latency.as_secs_f64() * 1000.0);
    }

    /// Merge another aggregator into this one
    pub fn merge(&mut self, other: &FlushStatsAggregator) {
        self.total_flushes += other.total_flushes;
        self.total_items += other.total_items;
        self.failed_flushes += other.failed_flushes;
        self.batch_size_stats.merge(&other.batch_size_stats);
        self.latency_stats.merge(&other.latency_stats);
        self.flush_time_stats.merge(&other.flush_time_stats);
    }

    /// Build a summary report
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_flushes: self.total_flushes,
            total_items: self.total_items,
            failed_flushes: self.failed_flushes,
            failure_rate: if self.total_flushes > 0 {
                self.failed_flushes as f64 / self.total_flushes as f64 * 100.0
            } else {
                0.0
            },
            batch_size: StatsSummary::from(&self.batch_size_stats),
            latency_ms: StatsSummary::from(&self.latency_stats),
            flush_time_ms: StatsSummary::from(&self.flush_time_stats),
        }
    }

    /// Reset all statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_flushes: u64,
    pub total_items: u64,
    pub failed_flushes: u64,
    pub failure_rate: f64,
    pub batch_size: StatsSummary,
    pub latency_ms: StatsSummary,
    pub flush_time_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Flush Metrics Summary ===")?;
        writeln!(f, "Flushes: {}", self.total_flushes)?;
        writeln!(f, "Items delivered: {}", self.total_items)?;
        writeln!(
            f,
            "Failed flushes: {} ({:.2}%)",
            self.failed_flushes, self.failure_rate
        )?;
        writeln!(f, "Batch size: {}", self.batch_size)?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;
        writeln!(f, "Flush time (ms): {}", self.flush_time_ms)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a sample
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// Combine with another set of samples
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        self.m2 += other.m2
            + delta * delta * (self.count as f64 * other.count as f64) / count as f64;
        self.mean += delta * other.count as f64 / count as f64;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.count = count;
    }

    /// Sample count
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Standard deviation
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Smallest sample
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Largest sample
    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        stats.push(1.0);
        stats.push(2.0);
        stats.push(3.0);
        stats.push(4.0);
        stats.push(5.0);

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_running_stats_merge_matches_sequential() {
        let mut left = RunningStats::default();
        let mut right = RunningStats::default();
        let mut all = RunningStats::default();
        for v in [1.0, 2.0, 3.0] {
            left.push(v);
            all.push(v);
        }
        for v in [10.0, 20.0] {
            right.push(v);
            all.push(v);
        }

        left.merge(&right);
        assert_eq!(left.count(), all.count());
        assert!((left.mean() - all.mean()).abs() < 1e-10);
        assert!((left.variance() - all.variance()).abs() < 1e-9);
        assert!((left.max() - 20.0).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_record_flush() {
        let mut aggregator = FlushStatsAggregator::new();
        aggregator.record_flush(10, Duration::from_millis(2), true);
        aggregator.record_flush(4, Duration::from_millis(1), false);
        aggregator.record_latency(Duration::from_millis(3));

        assert_eq!(aggregator.total_flushes, 2);
        assert_eq!(aggregator.total_items, 14);
        assert_eq!(aggregator.failed_flushes, 1);

        let summary = aggregator.summary();
        assert!((summary.failure_rate - 50.0).abs() < 1e-10);
        assert!((summary.batch_size.mean - 7.0).abs() < 1e-10);
        assert_eq!(summary.latency_ms.count, 1);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = FlushStatsAggregator::new();
        aggregator.record_flush(3, Duration::from_millis(1), true);
        let text = aggregator.summary().to_string();
        assert!(text.contains("Flushes: 1"));
        assert!(text.contains("Latency (ms): N/A"));
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: calls are no-ops
        record_enqueued("noop", 3);
        record_flush("noop", 3, Duration::from_millis(1), true);
        record_inbox_depth("noop", 0);
        record_reschedule("noop");
    }
}
