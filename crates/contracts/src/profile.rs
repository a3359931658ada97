//! BenchProfile - load generator description
//!
//! Consumed by `config_loader` and the bench CLI.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{BatcherConfig, SchedulerKind};

/// Profile format version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileVersion {
    #[default]
    #[serde(rename = "1")]
    V1,
}

/// Complete bench profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchProfile {
    /// Profile format version
    #[serde(default)]
    pub version: ProfileVersion,

    /// Scheduling facility
    #[serde(default)]
    pub scheduler: SchedulerKind,

    /// Dispatcher under test
    #[serde(default)]
    pub dispatcher: BatcherConfig,

    /// Producer side
    #[serde(default)]
    pub load: LoadProfile,

    /// Consumer side
    #[serde(default)]
    pub processor: ProcessorProfile,
}

/// Producer load shape
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoadProfile {
    /// Concurrent producer threads
    #[validate(range(min = 1))]
    pub producers: usize,

    /// Items each producer submits
    #[validate(range(min = 1))]
    pub items_per_producer: usize,

    /// Items per `enqueue_many` call
    #[validate(range(min = 1))]
    pub chunk_size: usize,

    /// Pause between chunks (milliseconds)
    pub interval_ms: u64,

    /// Payload size per item (bytes)
    pub payload_bytes: usize,
}

impl Default for LoadProfile {
    fn default() -> Self {
        Self {
            producers: 4,
            items_per_producer: 1000,
            chunk_size: 1,
            interval_ms: 0,
            payload_bytes: 64,
        }
    }
}

impl LoadProfile {
    /// Total items the profile produces
    pub fn total_items(&self) -> usize {
        self.producers * self.items_per_producer
    }
}

/// Simulated consumer behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorProfile {
    /// Busy time per item (microseconds)
    pub work_per_item_us: u64,

    /// Fail every n-th batch (0 = never)
    pub fail_every: u64,
}
