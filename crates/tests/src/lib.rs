//! # Integration Tests
//!
//! End-to-end behaviour of the batching dispatcher on real schedulers.
//!
//! Covers:
//! - Batch shape under bursts (capacity-sized, consecutive, back to back)
//! - Latency for trickling producers
//! - Completeness under concurrent producers
//! - Failure and shutdown paths

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{BatcherConfig, SchedulerKind};

    #[test]
    fn test_profile_round_trip_keeps_dispatcher_config() {
        let content = r#"
scheduler = "tokio"

[dispatcher]
name = "docs"
capacity = 10
delay_ms = 1000
"#;
        let profile = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();
        let toml = ConfigLoader::to_toml(&profile).unwrap();
        let again = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();

        assert_eq!(
            again.dispatcher,
            BatcherConfig::new("docs", 10, std::time::Duration::from_secs(1))
        );
        assert_eq!(again.scheduler, SchedulerKind::Tokio);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    use contracts::{BatcherConfig, ContractError, ErrorHook};
    use dispatcher::{
        BatchingDispatcher, DispatcherBuilder, DispatcherError, ThreadScheduler, TokioScheduler,
    };

    type Batches<T> = Arc<Mutex<Vec<Vec<T>>>>;

    /// Dispatcher on its own flush thread that records every batch
    fn recording_dispatcher(
        name: &str,
        capacity: usize,
        delay: Duration,
    ) -> (BatchingDispatcher<u32>, Batches<u32>) {
        let batches: Batches<u32> = Arc::default();
        let sink = Arc::clone(&batches);
        let dispatcher = DispatcherBuilder::new(BatcherConfig::new(name, capacity, delay))
            .build(move |batch: Vec<u32>| -> Result<(), ContractError> {
                sink.lock().unwrap().push(batch);
                Ok(())
            })
            .unwrap();
        (dispatcher, batches)
    }

    fn assert_consecutive(batch: &[u32]) {
        for pair in batch.windows(2) {
            assert_eq!(pair[1], pair[0] + 1, "batch not consecutive: {batch:?}");
        }
    }

    /// One call of 100 items, capacity 10, long delay
    #[test]
    fn test_single_burst_drains_in_capacity_batches() {
        observability::init_for_tests();
        let (dispatcher, batches) = recording_dispatcher("burst", 10, Duration::from_millis(1000));

        let started = Instant::now();
        dispatcher.enqueue_many(0..100).unwrap();
        dispatcher.await_idle();
        let elapsed = started.elapsed();

        let batches = batches.lock().unwrap();
        assert_eq!(batches.len(), 10);
        for (i, batch) in batches.iter().enumerate() {
            assert_eq!(batch.len(), 10);
            assert_consecutive(batch);
            assert_eq!(batch[0], i as u32 * 10);
        }
        // Saturated inbox flushes back to back, never waiting out the delay
        assert!(elapsed < Duration::from_millis(900), "took {elapsed:?}");
        assert_eq!(dispatcher.pending_count(), 0);
    }

    /// 20 calls of 5 items, capacity 10, zero delay
    #[test]
    fn test_zero_delay_chunks_all_delivered_in_order() {
        observability::init_for_tests();
        let (dispatcher, batches) = recording_dispatcher("chunks", 10, Duration::ZERO);

        for chunk in 0..20u32 {
            dispatcher.enqueue_many(chunk * 5..chunk * 5 + 5).unwrap();
        }
        dispatcher.await_idle();

        let batches = batches.lock().unwrap();
        let delivered: Vec<u32> = batches.iter().flatten().copied().collect();
        assert_eq!(delivered, (0..100).collect::<Vec<_>>());
        for batch in batches.iter() {
            assert!(!batch.is_empty() && batch.len() <= 10);
            assert_consecutive(batch);
        }
    }

    /// Same load, but each call lands on an idle dispatcher
    #[test]
    fn test_zero_delay_idle_chunks_flush_individually() {
        let (dispatcher, batches) = recording_dispatcher("paced-chunks", 10, Duration::ZERO);

        for chunk in 0..20u32 {
            dispatcher.enqueue_many(chunk * 5..chunk * 5 + 5).unwrap();
            dispatcher.await_idle();
        }

        let batches = batches.lock().unwrap();
        assert!(batches.len() >= 20, "only {} invocations", batches.len());
        assert_eq!(batches.iter().map(Vec::len).sum::<usize>(), 100);
        batches.iter().for_each(|b| assert_consecutive(b));
    }

    /// Items arriving slower than the delay are flushed right away
    #[test]
    fn test_trickle_latency_stays_below_delay() {
        observability::init_for_tests();
        let delay = Duration::from_millis(500);
        let latencies: Arc<Mutex<Vec<Duration>>> = Arc::default();
        let sink = Arc::clone(&latencies);
        let dispatcher = DispatcherBuilder::new(BatcherConfig::new("trickle", 100, delay))
            .build(move |batch: Vec<Instant>| -> Result<(), ContractError> {
                assert_eq!(batch.len(), 1);
                sink.lock().unwrap().push(batch[0].elapsed());
                Ok(())
            })
            .unwrap();

        for _ in 0..5 {
            dispatcher.enqueue(Instant::now()).unwrap();
            thread::sleep(Duration::from_millis(600));
        }
        dispatcher.await_idle();

        let latencies = latencies.lock().unwrap();
        assert_eq!(latencies.len(), 5);
        for latency in latencies.iter() {
            assert!(*latency < delay - Duration::from_millis(1), "latency {latency:?}");
        }
    }

    /// Burst right after a flush waits out the rest of the delay window
    #[test]
    fn test_burst_after_flush_is_paced() {
        let delay = Duration::from_millis(300);
        let flushed_at: Arc<Mutex<Vec<Instant>>> = Arc::default();
        let sink = Arc::clone(&flushed_at);
        let dispatcher = DispatcherBuilder::new(BatcherConfig::new("paced", 100, delay))
            .build(move |_batch: Vec<u32>| -> Result<(), ContractError> {
                sink.lock().unwrap().push(Instant::now());
                Ok(())
            })
            .unwrap();

        dispatcher.enqueue(0).unwrap();
        dispatcher.await_idle();
        dispatcher.enqueue_many(1..5).unwrap();
        dispatcher.await_idle();

        let flushed_at = flushed_at.lock().unwrap();
        assert_eq!(flushed_at.len(), 2);
        let gap = flushed_at[1] - flushed_at[0];
        assert!(gap >= delay - Duration::from_millis(20), "gap {gap:?}");
    }

    /// 5 threads x 200 items, capacity 10
    #[test]
    fn test_concurrent_producers_deliver_everything_once() {
        observability::init_for_tests();
        const THREADS: u32 = 5;
        const PER_THREAD: u32 = 200;

        let (dispatcher, batches) =
            recording_dispatcher("threads", 10, Duration::from_millis(1000));
        let dispatcher = Arc::new(dispatcher);

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let dispatcher = Arc::clone(&dispatcher);
                thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        dispatcher.enqueue(t * 10_000 + i).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        dispatcher.await_idle();
        assert_eq!(dispatcher.pending_count(), 0);

        let batches = batches.lock().unwrap();
        assert!(batches.iter().all(|b| b.len() <= 10));

        let mut per_thread: Vec<Vec<u32>> = vec![Vec::new(); THREADS as usize];
        for item in batches.iter().flatten() {
            per_thread[(item / 10_000) as usize].push(item % 10_000);
        }
        for items in per_thread {
            assert_eq!(items, (0..PER_THREAD).collect::<Vec<_>>());
        }

        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.delivered_count, u64::from(THREADS * PER_THREAD));
        assert_eq!(snapshot.enqueued_count, u64::from(THREADS * PER_THREAD));
    }

    /// Processor errors reach the scheduler hook without stalling delivery
    #[test]
    fn test_processor_errors_reach_hook_and_do_not_stall() {
        let (tx, reported) = mpsc::channel::<String>();
        let tx = Mutex::new(tx);
        let hook: ErrorHook = Arc::new(move |e: &ContractError| {
            let _ = tx.lock().unwrap().send(e.to_string());
        });
        let scheduler = Arc::new(ThreadScheduler::with_error_hook("failing", hook).unwrap());

        let seen = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&seen);
        let dispatcher = BatchingDispatcher::new(
            BatcherConfig::new("failing", 4, Duration::ZERO),
            scheduler,
            move |batch: Vec<u32>| -> Result<(), ContractError> {
                sink.fetch_add(batch.len(), Ordering::SeqCst);
                Err(ContractError::processor(batch.len(), "downstream unavailable"))
            },
        )
        .unwrap();

        dispatcher.enqueue_many(0..10).unwrap();
        dispatcher.await_idle();

        assert_eq!(seen.load(Ordering::SeqCst), 10);
        // The hook runs after the flush bookkeeping, so it may trail await_idle
        for _ in 0..3 {
            let message = reported.recv_timeout(Duration::from_secs(5)).unwrap();
            assert!(message.contains("downstream unavailable"), "got: {message}");
        }
        assert_eq!(dispatcher.metrics().snapshot().failure_count, 3);
        assert_eq!(dispatcher.pending_count(), 0);
    }

    /// A flush waiting out the delay window never runs after stop
    #[test]
    fn test_stop_cancels_pending_flush() {
        let (dispatcher, batches) = recording_dispatcher("cancel", 100, Duration::from_millis(200));
        dispatcher.enqueue(0).unwrap();
        dispatcher.await_idle();

        // Inside the delay window: scheduled ~200ms out
        dispatcher.enqueue_many(1..4).unwrap();
        dispatcher.stop();
        thread::sleep(Duration::from_millis(400));

        assert!(dispatcher.is_stopped());
        assert_eq!(batches.lock().unwrap().len(), 1);
        assert_eq!(dispatcher.pending_count(), 3);
    }

    /// Stopped dispatchers schedule nothing; flush_all still drains
    #[test]
    fn test_stop_then_flush_all() {
        let (dispatcher, batches) = recording_dispatcher("stopped", 3, Duration::from_millis(200));
        dispatcher.stop();
        dispatcher.enqueue_many(0..7).unwrap();

        assert!(dispatcher.await_idle_timeout(Duration::from_millis(300)));
        assert_eq!(dispatcher.pending_count(), 7);
        assert!(batches.lock().unwrap().is_empty());

        assert_eq!(dispatcher.flush_all().unwrap(), 7);
        let batches = batches.lock().unwrap();
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    /// Same guarantees on the tokio scheduler
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_tokio_scheduler_burst_and_concurrency() {
        observability::init_for_tests();
        let scheduler = Arc::new(TokioScheduler::current("tokio-e2e").unwrap());
        let batches: Batches<u32> = Arc::default();
        let sink = Arc::clone(&batches);
        let dispatcher = Arc::new(
            BatchingDispatcher::new(
                BatcherConfig::new("tokio-e2e", 10, Duration::from_millis(1000)),
                scheduler,
                move |batch: Vec<u32>| -> Result<(), ContractError> {
                    sink.lock().unwrap().push(batch);
                    Ok(())
                },
            )
            .unwrap(),
        );

        let producer = Arc::clone(&dispatcher);
        tokio::task::spawn_blocking(move || {
            let handles: Vec<_> = (0..4u32)
                .map(|t| {
                    let dispatcher = Arc::clone(&producer);
                    thread::spawn(move || {
                        for chunk in 0..25u32 {
                            let base = t * 1000 + chunk * 4;
                            dispatcher.enqueue_many(base..base + 4).unwrap();
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
            producer.await_idle();
        })
        .await
        .unwrap();

        let batches = batches.lock().unwrap();
        assert!(batches.iter().all(|b| b.len() <= 10));
        assert_eq!(batches.iter().map(Vec::len).sum::<usize>(), 400);
        assert_eq!(dispatcher.pending_count(), 0);
    }

    /// Flushes stay serialized when the blocking pool has spare threads
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_tokio_scheduler_runs_one_flush_at_a_time() {
        const PRODUCERS: u32 = 8;
        const PER_PRODUCER: u32 = 50;

        let scheduler = Arc::new(TokioScheduler::current("tokio-serial").unwrap());
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));
        let delivered = Arc::new(AtomicUsize::new(0));
        let (active_in, max_in, delivered_in) = (
            Arc::clone(&active),
            Arc::clone(&max_active),
            Arc::clone(&delivered),
        );
        let dispatcher = Arc::new(
            BatchingDispatcher::new(
                BatcherConfig::new("tokio-serial", 3, Duration::ZERO),
                scheduler,
                move |batch: Vec<u32>| -> Result<(), ContractError> {
                    let now = active_in.fetch_add(1, Ordering::SeqCst) + 1;
                    max_in.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_micros(200));
                    delivered_in.fetch_add(batch.len(), Ordering::SeqCst);
                    active_in.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                },
            )
            .unwrap(),
        );

        let producer = Arc::clone(&dispatcher);
        tokio::task::spawn_blocking(move || {
            let handles: Vec<_> = (0..PRODUCERS)
                .map(|t| {
                    let dispatcher = Arc::clone(&producer);
                    thread::spawn(move || {
                        for i in 0..PER_PRODUCER {
                            dispatcher.enqueue(t * 1000 + i).unwrap();
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
            producer.await_idle();
        })
        .await
        .unwrap();

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert_eq!(
            delivered.load(Ordering::SeqCst),
            (PRODUCERS * PER_PRODUCER) as usize
        );
        assert_eq!(dispatcher.pending_count(), 0);
    }

    /// A dispatcher whose runtime is gone refuses new work and stays idle
    #[test]
    fn test_enqueue_after_runtime_shutdown_fails() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let scheduler = Arc::new(TokioScheduler::new("tokio-gone", rt.handle().clone()));
        let (dispatcher, batches) = {
            let batches: Batches<u32> = Arc::default();
            let sink = Arc::clone(&batches);
            let dispatcher = BatchingDispatcher::new(
                BatcherConfig::new("tokio-gone", 10, Duration::from_millis(50)),
                scheduler,
                move |batch: Vec<u32>| -> Result<(), ContractError> {
                    sink.lock().unwrap().push(batch);
                    Ok(())
                },
            )
            .unwrap();
            (dispatcher, batches)
        };
        drop(rt);

        let err = dispatcher.enqueue(1).unwrap_err();
        assert!(matches!(err, DispatcherError::Scheduler { .. }), "got: {err}");
        assert!(dispatcher.is_stopped());
        assert!(dispatcher.await_idle_timeout(Duration::from_secs(2)));
        assert_eq!(dispatcher.pending_count(), 1);
        assert!(batches.lock().unwrap().is_empty());
    }
}
