//! ThreadScheduler - one named worker thread draining a deadline queue

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{ContractError, ErrorHook, ScheduledTask, Scheduler, Task};
use tracing::{debug, error};

use super::log_error_hook;

/// Deadline, then submission order
type TaskKey = (Instant, u64);

struct TaskQueue {
    tasks: BTreeMap<TaskKey, Task>,
    next_seq: u64,
    shutdown: bool,
}

struct QueueShared {
    queue: Mutex<TaskQueue>,
    wakeup: Condvar,
}

impl QueueShared {
    fn lock(&self) -> MutexGuard<'_, TaskQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scheduler backed by a single dedicated thread
///
/// Tasks run one at a time in deadline order. Dropping the scheduler stops
/// the worker; tasks still queued are dropped without running.
pub struct ThreadScheduler {
    name: String,
    shared: Arc<QueueShared>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadScheduler {
    /// Spawn a scheduler whose task failures are logged
    pub fn new(name: impl Into<String>) -> Result<Self, ContractError> {
        let name = name.into();
        let hook = log_error_hook(name.clone());
        Self::with_error_hook(name, hook)
    }

    /// Spawn a scheduler reporting task failures to `on_error`
    pub fn with_error_hook(
        name: impl Into<String>,
        on_error: ErrorHook,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let shared = Arc::new(QueueShared {
            queue: Mutex::new(TaskQueue {
                tasks: BTreeMap::new(),
                next_seq: 0,
                shutdown: false,
            }),
            wakeup: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker_name = name.clone();
        let worker = thread::Builder::new()
            .name(format!("{name}-flush"))
            .spawn(move || worker_loop(worker_shared, worker_name, on_error))?;

        Ok(Self {
            name,
            shared,
            worker: Some(worker),
        })
    }

    /// Number of tasks waiting to run
    pub fn queued(&self) -> usize {
        self.shared.lock().tasks.len()
    }
}

impl Scheduler for ThreadScheduler {
    fn name(&self) -> &str {
        &self.name
    }

    fn schedule(
        &self,
        delay: Duration,
        task: Task,
    ) -> Result<Box<dyn ScheduledTask>, ContractError> {
        let mut queue = self.shared.lock();
        if queue.shutdown {
            return Err(ContractError::scheduler(format!(
                "scheduler '{}' is shut down",
                self.name
            )));
        }

        let key = (Instant::now() + delay, queue.next_seq);
        queue.next_seq += 1;
        // Only a new head changes how long the worker should sleep
        let new_head = queue
            .tasks
            .first_key_value()
            .is_none_or(|(head, _)| key < *head);
        queue.tasks.insert(key, task);
        drop(queue);

        if new_head {
            self.shared.wakeup.notify_one();
        }

        Ok(Box::new(QueuedTask {
            shared: Arc::downgrade(&self.shared),
            key,
        }))
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.wakeup.notify_all();

        let Some(worker) = self.worker.take() else {
            return;
        };
        // Last reference released from inside a task: the worker exits on its own
        if worker.thread().id() == thread::current().id() {
            return;
        }
        if worker.join().is_err() {
            error!(scheduler = %self.name, "Scheduler worker panicked");
        }
    }
}

/// Handle to a task in the queue
struct QueuedTask {
    shared: Weak<QueueShared>,
    key: TaskKey,
}

impl ScheduledTask for QueuedTask {
    fn cancel(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.lock().tasks.remove(&self.key);
        }
    }
}

fn worker_loop(shared: Arc<QueueShared>, name: String, on_error: ErrorHook) {
    debug!(scheduler = %name, "Scheduler worker started");

    let mut queue = shared.lock();
    loop {
        if queue.shutdown {
            break;
        }

        let now = Instant::now();
        match queue.tasks.first_key_value().map(|(key, _)| *key) {
            None => {
                queue = shared
                    .wakeup
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            Some(key) if key.0 <= now => {
                let Some(task) = queue.tasks.remove(&key) else {
                    continue;
                };
                drop(queue);
                run_task(task, &on_error);
                queue = shared.lock();
            }
            Some((deadline, _)) => {
                queue = shared
                    .wakeup
                    .wait_timeout(queue, deadline - now)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
            }
        }
    }

    let abandoned = std::mem::take(&mut queue.tasks);
    drop(queue);
    debug!(
        scheduler = %name,
        abandoned = abandoned.len(),
        "Scheduler worker stopped"
    );
}

fn run_task(task: Task, on_error: &ErrorHook) {
    match catch_unwind(AssertUnwindSafe(task)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => on_error(&e),
        Err(payload) => on_error(&ContractError::task_panicked(payload.as_ref())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn recording_hook() -> (ErrorHook, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let hook: ErrorHook = Arc::new(move |e: &ContractError| {
            seen_clone.lock().unwrap().push(e.to_string());
        });
        (hook, seen)
    }

    #[test]
    fn test_tasks_run_in_deadline_order() {
        let scheduler = ThreadScheduler::new("order").unwrap();
        let (tx, rx) = mpsc::channel();

        for (label, delay_ms) in [("late", 60), ("early", 10), ("middle", 30)] {
            let tx = tx.clone();
            scheduler
                .schedule(
                    Duration::from_millis(delay_ms),
                    Box::new(move || {
                        tx.send(label).unwrap();
                        Ok(())
                    }),
                )
                .unwrap();
        }

        let got: Vec<_> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(got, vec!["early", "middle", "late"]);
    }

    #[test]
    fn test_cancelled_task_never_runs() {
        let scheduler = ThreadScheduler::new("cancel").unwrap();
        let (tx, rx) = mpsc::channel::<&str>();

        let tx_cancelled = tx.clone();
        let handle = scheduler
            .schedule(
                Duration::from_millis(50),
                Box::new(move || {
                    tx_cancelled.send("cancelled").unwrap();
                    Ok(())
                }),
            )
            .unwrap();
        handle.cancel();
        assert_eq!(scheduler.queued(), 0);

        scheduler
            .schedule(
                Duration::from_millis(100),
                Box::new(move || {
                    tx.send("kept").unwrap();
                    Ok(())
                }),
            )
            .unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "kept");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_errors_and_panics_reach_hook() {
        let (hook, seen) = recording_hook();
        let scheduler = ThreadScheduler::with_error_hook("hooked", hook).unwrap();
        let (tx, rx) = mpsc::channel();

        scheduler
            .schedule(
                Duration::ZERO,
                Box::new(|| Err(ContractError::processor(3, "bad batch"))),
            )
            .unwrap();
        scheduler
            .schedule(Duration::from_millis(5), Box::new(|| -> Result<(), ContractError> { panic!("exploded") }))
            .unwrap();
        // Worker survives the panic and keeps running tasks
        scheduler
            .schedule(
                Duration::from_millis(20),
                Box::new(move || {
                    tx.send(()).unwrap();
                    Ok(())
                }),
            )
            .unwrap();

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].contains("bad batch"));
        assert!(seen[1].contains("exploded"));
    }

    #[test]
    fn test_drop_stops_worker() {
        let scheduler = ThreadScheduler::new("drop").unwrap();
        let (tx, rx) = mpsc::channel::<()>();
        scheduler
            .schedule(
                Duration::from_secs(60),
                Box::new(move || {
                    tx.send(()).unwrap();
                    Ok(())
                }),
            )
            .unwrap();

        drop(scheduler);
        // Task was dropped with the queue, so the sender is gone
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(1)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        ));
    }
}
