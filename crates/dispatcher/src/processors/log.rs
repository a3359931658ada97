//! LogProcessor - logs batch summaries via tracing

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{BatchProcessor, ContractError};
use tracing::{info, instrument};

/// Processor that logs batch summaries for debugging
#[derive(Debug)]
pub struct LogProcessor {
    name: String,
    batches: AtomicU64,
}

impl LogProcessor {
    /// Create a new LogProcessor with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            batches: AtomicU64::new(0),
        }
    }

    /// Processor name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Batches seen so far
    pub fn batch_count(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }
}

impl<T> BatchProcessor<T> for LogProcessor
where
    T: Debug + Send + 'static,
{
    #[instrument(
        name = "log_processor_process",
        skip(self, batch),
        fields(processor = %self.name, batch_size = batch.len())
    )]
    fn process(&self, batch: Vec<T>) -> Result<(), ContractError> {
        let seq = self.batches.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            processor = %self.name,
            seq,
            batch_size = batch.len(),
            first = ?batch.first(),
            last = ?batch.last(),
            "Batch received"
        );
        Ok(())
    }
}
