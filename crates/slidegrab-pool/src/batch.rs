//! Batch entry points: `run_batch` and Retry-Batch Escalation.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::aggregate::{aggregate, BatchSummary};
use crate::error::PoolError;
use crate::executor::{BoundedPool, ProgressHook};
use crate::retry::{RetryCoordinator, RetryPolicy};
use crate::task::{TaskDescriptor, TaskId, TaskResult};
use crate::worker::Worker;

/// Everything a finished batch produced.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport<P> {
    pub batch_id: Uuid,
    /// One result per submitted task, in completion order
    pub results: Vec<TaskResult<P>>,
    pub summary: BatchSummary,
    /// Failed results, payloads included, ready for resubmission
    pub failures: Vec<TaskResult<P>>,
}

impl<P> BatchReport<P> {
    fn errored(error: impl Into<String>) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            results: Vec::new(),
            summary: BatchSummary::errored(error),
            failures: Vec::new(),
        }
    }

    /// Results sorted by task id, numeric ids in numeric order.
    #[must_use]
    pub fn sorted_results(&self) -> Vec<&TaskResult<P>> {
        let mut sorted: Vec<&TaskResult<P>> = self.results.iter().collect();
        sorted.sort_by(|a, b| natural_key(&a.task_id).cmp(&natural_key(&b.task_id)));
        sorted
    }
}

fn natural_key(id: &TaskId) -> (String, u64, String) {
    let s = id.as_str();
    let split = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
    let (prefix, rest) = s.split_at(split);
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    let number = digits.parse().unwrap_or(0);
    (prefix.to_string(), number, rest[digits.len()..].to_string())
}

/// Operator-facing policy for resubmitting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBatchPolicy {
    /// Upper bound on retry-batch concurrency
    pub concurrency_cap: usize,
    /// Floor for every resubmitted task's retry budget
    pub min_max_retries: u32,
    /// Session mode for resubmitted tasks
    pub headless: bool,
}

impl Default for RetryBatchPolicy {
    fn default() -> Self {
        Self {
            concurrency_cap: 2,
            min_max_retries: 3,
            headless: false,
        }
    }
}

/// Runs batches through a [`BoundedPool`] and aggregates the results.
#[derive(Clone)]
pub struct BatchRunner {
    policy: RetryPolicy,
    cancel: CancellationToken,
    progress: Option<ProgressHook>,
}

impl BatchRunner {
    /// Create a runner using `policy` for every task's retries.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    /// Share a cancellation token with the caller (e.g. a Ctrl-C handler).
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

    /// Run `tasks` with at most `concurrency` in flight.
    ///
    /// Always returns a report; batch-level problems (no tasks, zero
    /// concurrency) land in `summary.error`.
    pub async fn run_batch<W: Worker>(
        &self,
        worker: Arc<W>,
        tasks: Vec<TaskDescriptor<W::Payload>>,
        concurrency: usize,
    ) -> BatchReport<W::Payload> {
        if tasks.is_empty() {
            warn!("Batch has no tasks");
            return BatchReport::errored(PoolError::NoTasks("nothing to submit".into()).to_string());
        }

        let pool = match BoundedPool::new(concurrency, RetryCoordinator::new(self.policy)) {
            Ok(pool) => pool.with_cancellation(self.cancel.clone()),
            Err(e) => {
                warn!("Batch rejected: {}", e);
                return BatchReport::errored(e.to_string());
            }
        };
        let pool = match &self.progress {
            Some(hook) => pool.with_progress(Arc::clone(hook)),
            None => pool,
        };

        let batch_id = Uuid::new_v4();
        let total = tasks.len();
        info!(
            "Batch {} started: {} task(s), concurrency {}",
            batch_id,
            total,
            pool.effective_concurrency(total)
        );

        let started = Instant::now();
        let results = pool.execute(worker, tasks).await;
        let (summary, failures) = aggregate(&results, started.elapsed());

        info!(
            "Batch {} finished: {}/{} succeeded in {:.1}s",
            batch_id, summary.succeeded, summary.total, summary.elapsed_secs
        );

        BatchReport {
            batch_id,
            results,
            summary,
            failures,
        }
    }

    /// Resubmit exactly the payloads of `failures` as a new batch.
    ///
    /// Tasks are relabelled `retry-{n}`, get a retry budget of at least
    /// `policy.min_max_retries`, and run with concurrency
    /// `min(policy.concurrency_cap, failures.len())`.
    pub async fn retry_batch<W: Worker>(
        &self,
        worker: Arc<W>,
        failures: &[TaskResult<W::Payload>],
        policy: &RetryBatchPolicy,
    ) -> BatchReport<W::Payload> {
        let tasks = retry_tasks(failures, policy);
        let concurrency = policy.concurrency_cap.min(tasks.len()).max(1);
        info!(
            "Retrying {} failed task(s) with concurrency {}",
            tasks.len(),
            concurrency
        );
        self.run_batch(worker, tasks, concurrency).await
    }
}

/// Descriptors for a retry batch built from failed results.
pub fn retry_tasks<P: Clone>(failures: &[TaskResult<P>], policy: &RetryBatchPolicy) -> Vec<TaskDescriptor<P>> {
    failures
        .iter()
        .enumerate()
        .map(|(i, failed)| {
            TaskDescriptor::new(
                format!("retry-{}", i + 1),
                failed.payload.clone(),
                failed.retry_count.max(policy.min_max_retries),
                policy.headless,
            )
        })
        .collect()
}
