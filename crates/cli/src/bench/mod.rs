//! Bench harness: producers, a checking processor and the run report.

mod processor;
mod runner;
mod stats;

pub use processor::{BenchItem, CheckingProcessor};
pub use runner::{BenchConfig, BenchRunner};
pub use stats::BenchStats;
