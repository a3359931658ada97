//! BatchProcessor trait - Dispatcher output interface
//!
//! Consumes one ordered, non-empty batch at a time.

use crate::ContractError;

/// Batch consumer
///
/// Invoked by the dispatcher with batches in enqueue order, never two at
/// once for the same dispatcher. The batch is handed over by value.
pub trait BatchProcessor<T>: Send + Sync + 'static {
    /// Process one batch
    ///
    /// # Errors
    /// A returned error is reported, never retried. The items are
    /// considered delivered either way.
    fn process(&self, batch: Vec<T>) -> Result<(), ContractError>;
}

impl<T, F> BatchProcessor<T> for F
where
    F: Fn(Vec<T>) -> Result<(), ContractError> + Send + Sync + 'static,
{
    fn process(&self, batch: Vec<T>) -> Result<(), ContractError> {
        self(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn run<P: BatchProcessor<u32>>(processor: &P, batch: Vec<u32>) -> Result<(), ContractError> {
        processor.process(batch)
    }

    #[test]
    fn test_closure_is_processor() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        let processor = move |batch: Vec<u32>| {
            seen_clone.fetch_add(batch.len(), Ordering::Relaxed);
            Ok(())
        };

        run(&processor, vec![1, 2, 3]).unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_closure_error_passthrough() {
        let processor =
            |batch: Vec<u32>| Err(ContractError::processor(batch.len(), "rejected"));
        let err = run(&processor, vec![7]).unwrap_err();
        assert!(matches!(err, ContractError::Processor { batch_size: 1, .. }));
    }
}
