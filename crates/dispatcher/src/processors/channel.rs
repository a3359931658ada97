//! ChannelProcessor - forwards batches to an async consumer

use contracts::{BatchProcessor, ContractError};
use tokio::sync::mpsc;
use tracing::warn;

/// Processor that hands each batch to a tokio channel
///
/// Blocks the flush while the channel is full, which pushes back on the
/// dispatcher. Flushes run off the async runtime (scheduler thread or
/// blocking pool), so the blocking send is allowed there; calling
/// `flush_all` from inside an async task is not.
#[derive(Debug)]
pub struct ChannelProcessor<T> {
    name: String,
    tx: mpsc::Sender<Vec<T>>,
}

impl<T: Send + 'static> ChannelProcessor<T> {
    /// Create a processor and the receiving end of its channel
    pub fn new(name: impl Into<String>, buffer: usize) -> (Self, mpsc::Receiver<Vec<T>>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            Self {
                name: name.into(),
                tx,
            },
            rx,
        )
    }
}

impl<T: Send + 'static> BatchProcessor<T> for ChannelProcessor<T> {
    fn process(&self, batch: Vec<T>) -> Result<(), ContractError> {
        let batch_size = batch.len();
        self.tx.blocking_send(batch).map_err(|_| {
            warn!(processor = %self.name, batch_size, "Receiver dropped, batch lost");
            ContractError::ProcessorClosed {
                name: self.name.clone(),
            }
        })
    }
}
