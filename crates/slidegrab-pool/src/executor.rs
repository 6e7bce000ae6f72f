//! Bounded Pool Executor.
//!
//! Every task is spawned onto the multi-threaded runtime up front and waits
//! for a semaphore permit before its Retry Coordinator starts, so no more
//! than `min(concurrency, tasks)` attempts (and sessions) are ever live.
//! Results are collected in completion order.

use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::{PoolError, Result};
use crate::retry::RetryCoordinator;
use crate::task::{Metrics, TaskDescriptor, TaskFailure, TaskId, TaskResult};
use crate::worker::Worker;

/// Snapshot emitted after every collected result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    /// Results collected so far
    pub completed: usize,
    /// Tasks in the batch
    pub total: usize,
    /// Successful results so far
    pub succeeded: usize,
    /// Time since the batch started
    pub elapsed: Duration,
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "progress: {}/{} | ok {} | {:.1}s",
            self.completed,
            self.total,
            self.succeeded,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Observer invoked after each result; has no influence on scheduling.
pub type ProgressHook = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Fixed-concurrency fan-out/fan-in scheduler.
#[derive(Clone)]
pub struct BoundedPool {
    concurrency: usize,
    coordinator: RetryCoordinator,
    cancel: CancellationToken,
    progress: Option<ProgressHook>,
}

impl BoundedPool {
    /// Create a pool.
    ///
    /// # Errors
    /// [`PoolError::InvalidConcurrency`] when `concurrency` is zero.
    pub fn new(concurrency: usize, coordinator: RetryCoordinator) -> Result<Self> {
        if concurrency == 0 {
            return Err(PoolError::InvalidConcurrency);
        }
        Ok(Self {
            concurrency,
            coordinator,
            cancel: CancellationToken::new(),
            progress: None,
        })
    }

    /// Observe `cancel`; tasks that have not been granted a permit when it
    /// fires are reported as cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Install a progress observer.
    #[must_use]
    pub fn with_progress(mut self, hook: ProgressHook) -> Self {
        self.progress = Some(hook);
        self
    }

    /// Parallelism actually used for a batch of `task_count` tasks.
    #[must_use]
    pub fn effective_concurrency(&self, task_count: usize) -> usize {
        self.concurrency.min(task_count).max(1)
    }

    /// Run every task exactly once and return one result per task, in
    /// completion order.
    pub async fn execute<W: Worker>(
        &self,
        worker: Arc<W>,
        tasks: Vec<TaskDescriptor<W::Payload>>,
    ) -> Vec<TaskResult<W::Payload>> {
        let total = tasks.len();
        if total == 0 {
            return Vec::new();
        }

        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.effective_concurrency(total)));
        debug!(
            "Dispatching {} task(s) with concurrency {}",
            total,
            self.effective_concurrency(total)
        );

        // Identity of every task still owed a result; a task whose future
        // dies outside the panic guard is still reported.
        let mut pending: Vec<Option<(TaskId, W::Payload)>> = Vec::with_capacity(total);
        let mut set = JoinSet::new();

        for (slot, task) in tasks.into_iter().enumerate() {
            pending.push(Some((task.task_id.clone(), task.payload.clone())));

            let worker = Arc::clone(&worker);
            let semaphore = Arc::clone(&semaphore);
            let coordinator = self.coordinator;
            let cancel = self.cancel.clone();

            set.spawn(async move {
                let result = run_one(worker, task, semaphore, coordinator, cancel).await;
                (slot, result)
            });
        }

        let mut results = Vec::with_capacity(total);
        let mut succeeded = 0;

        while let Some(joined) = set.join_next().await {
            let result = match joined {
                Ok((slot, result)) => {
                    pending[slot] = None;
                    result
                }
                Err(e) => {
                    error!("Worker task aborted: {}", e);
                    continue;
                }
            };

            if result.success {
                succeeded += 1;
            }
            results.push(result);
            self.report(results.len(), total, succeeded, started);
        }

        for (task_id, payload) in pending.into_iter().flatten() {
            error!(task_id = %task_id, "No result collected; recording internal fault");
            results.push(TaskResult::failed(
                task_id,
                payload,
                TaskFailure::internal("worker task aborted"),
                0,
                Metrics::new(),
                Duration::ZERO,
            ));
            self.report(results.len(), total, succeeded, started);
        }

        results
    }

    fn report(&self, completed: usize, total: usize, succeeded: usize, started: Instant) {
        if let Some(hook) = &self.progress {
            hook(&ProgressEvent {
                completed,
                total,
                succeeded,
                elapsed: started.elapsed(),
            });
        }
    }
}

async fn run_one<W: Worker>(
    worker: Arc<W>,
    task: TaskDescriptor<W::Payload>,
    semaphore: Arc<Semaphore>,
    coordinator: RetryCoordinator,
    cancel: CancellationToken,
) -> TaskResult<W::Payload> {
    let permit = tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        permit = semaphore.acquire_owned() => permit.ok(),
    };
    let Some(_permit) = permit else {
        debug!(task_id = %task.task_id, "Not started, batch interrupted");
        return TaskResult::failed(
            task.task_id,
            task.payload,
            TaskFailure::cancelled("batch interrupted before the task started"),
            0,
            Metrics::new(),
            Duration::ZERO,
        );
    };

    let started = Instant::now();
    let current_attempt = AtomicU32::new(0);
    let run = AssertUnwindSafe(coordinator.run_tracked(worker.as_ref(), &task, &cancel, &current_attempt))
        .catch_unwind()
        .await;

    match run {
        Ok(result) => result,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(task_id = %task.task_id, "Worker crashed: {}", message);
            TaskResult::failed(
                task.task_id,
                task.payload,
                TaskFailure::internal(message),
                current_attempt.load(Ordering::SeqCst),
                Metrics::new(),
                started.elapsed(),
            )
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttemptError;
    use crate::retry::RetryPolicy;
    use crate::task::{FailureKind, WorkOutcome};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoWorker;

    #[async_trait]
    impl Worker for EchoWorker {
        type Payload = u32;

        async fn attempt(&self, payload: &u32, _headless: bool) -> std::result::Result<WorkOutcome, AttemptError> {
            match payload {
                0 => panic!("payload zero is a defect"),
                p if p % 2 == 0 => Err(AttemptError::Action("even payload".into())),
                p => Ok(WorkOutcome::success(Metrics::new().with("items", u64::from(*p)))),
            }
        }
    }

    fn pool(concurrency: usize) -> BoundedPool {
        BoundedPool::new(concurrency, RetryCoordinator::new(RetryPolicy::immediate()))
            .expect("valid concurrency")
    }

    fn tasks(payloads: &[u32]) -> Vec<TaskDescriptor<u32>> {
        payloads
            .iter()
            .enumerate()
            .map(|(i, p)| TaskDescriptor::new(i + 1, *p, 0, true))
            .collect()
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = BoundedPool::new(0, RetryCoordinator::default()).err();
        assert!(matches!(err, Some(PoolError::InvalidConcurrency)));
    }

    #[test]
    fn test_effective_concurrency() {
        let pool = pool(10);
        assert_eq!(pool.effective_concurrency(3), 3);
        assert_eq!(pool.effective_concurrency(30), 10);
    }

    #[test]
    fn test_progress_display() {
        let event = ProgressEvent {
            completed: 3,
            total: 10,
            succeeded: 2,
            elapsed: Duration::from_millis(12_340),
        };
        assert_eq!(event.to_string(), "progress: 3/10 | ok 2 | 12.3s");
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(boxed.as_ref()), "owned boom");
        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "worker panicked");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_panic_is_isolated() {
        let results = pool(4).execute(Arc::new(EchoWorker), tasks(&[1, 0, 3, 4])).await;

        assert_eq!(results.len(), 4);
        let crashed = results.iter().find(|r| r.payload == 0).expect("crashed task reported");
        assert!(!crashed.success);
        let error = crashed.error.clone().expect("error present");
        assert_eq!(error.kind, FailureKind::Internal);
        assert_eq!(error.to_string(), "internal fault: payload zero is a defect");

        let ok: Vec<u32> = results.iter().filter(|r| r.success).map(|r| r.payload).collect();
        assert_eq!(ok.len(), 2);
        assert!(ok.contains(&1) && ok.contains(&3));
    }

    #[tokio::test]
    async fn test_progress_hook_called_per_result() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let pool = pool(2).with_progress(Arc::new(move |event: &ProgressEvent| {
            sink.lock().expect("progress lock").push(*event);
        }));

        pool.execute(Arc::new(EchoWorker), tasks(&[1, 2, 3])).await;

        let events = events.lock().expect("progress lock");
        assert_eq!(events.len(), 3);
        assert_eq!(events.iter().map(|e| e.completed).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(events.iter().all(|e| e.total == 3));
        assert_eq!(events.last().map(|e| e.succeeded), Some(2));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let results = pool(2)
            .with_cancellation(cancel)
            .execute(Arc::new(EchoWorker), tasks(&[1, 3, 5]))
            .await;

        assert_eq!(results.len(), 3);
        for result in &results {
            assert!(!result.success);
            assert!(result
                .error_message()
                .is_some_and(|m| m.starts_with("cancelled: ")));
        }
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let results = pool(3).execute(Arc::new(EchoWorker), Vec::new()).await;
        assert!(results.is_empty());
    }
}
