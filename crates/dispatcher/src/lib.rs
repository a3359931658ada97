//! # Dispatcher
//!
//! Batching dispatcher.
//!
//! Responsibilities:
//! - Accept items from any number of producer threads without blocking them
//! - Deliver them in order, at most `capacity` per batch, one batch at a time
//! - Flush immediately after idle periods, pace flushes by `delay` under load

pub mod dispatcher;
pub mod error;
mod handle;
pub mod metrics;
pub mod processors;
pub mod scheduler;

pub use contracts::{BatchProcessor, BatcherConfig, Scheduler};
pub use dispatcher::{desired_delay, BatchingDispatcher, DispatcherBuilder};
pub use error::DispatcherError;
pub use metrics::{DispatcherMetrics, MetricsSnapshot};
pub use processors::{ChannelProcessor, LogProcessor};
pub use scheduler::{log_error_hook, ThreadScheduler, TokioScheduler};
