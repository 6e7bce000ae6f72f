//! Bounded retry with flat jittered backoff.

use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AttemptError;
use crate::task::{Metrics, TaskDescriptor, TaskFailure, TaskResult};
use crate::worker::Worker;

/// Delay ranges used by the [`RetryCoordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Range of the random delay before attempt 0
    pub startup_delay: (Duration, Duration),
    /// Range of the random delay before every later attempt
    pub retry_delay: (Duration, Duration),
}

impl RetryPolicy {
    /// Policy without any delays; handy for tests and single quick tasks.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            startup_delay: (Duration::ZERO, Duration::ZERO),
            retry_delay: (Duration::ZERO, Duration::ZERO),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            startup_delay: (Duration::ZERO, Duration::from_secs(3)),
            retry_delay: (Duration::from_secs(5), Duration::from_secs(15)),
        }
    }
}

/// Uniform random duration in `[min, max]` at millisecond resolution.
pub(crate) fn jitter((min, max): (Duration, Duration)) -> Duration {
    let min_ms = u64::try_from(min.as_millis()).unwrap_or(u64::MAX);
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
}

/// Runs one task through up to `1 + max_retries` attempts.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryCoordinator {
    policy: RetryPolicy,
}

impl RetryCoordinator {
    /// Create a coordinator with the given delays.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Execute `task`, retrying failed attempts.
    ///
    /// Never fails: exhaustion and cancellation are both reported as failed
    /// [`TaskResult`]s. Cancellation is observed before attempt 0 and between
    /// attempts; a running attempt is always allowed to finish.
    pub async fn run<W: Worker>(
        &self,
        worker: &W,
        task: &TaskDescriptor<W::Payload>,
        cancel: &CancellationToken,
    ) -> TaskResult<W::Payload> {
        self.run_tracked(worker, task, cancel, &AtomicU32::new(0)).await
    }

    /// Like [`run`](Self::run), storing the index of the attempt in flight
    /// in `current_attempt` so a caller can still report it if the worker
    /// panics.
    pub(crate) async fn run_tracked<W: Worker>(
        &self,
        worker: &W,
        task: &TaskDescriptor<W::Payload>,
        cancel: &CancellationToken,
        current_attempt: &AtomicU32,
    ) -> TaskResult<W::Payload> {
        let started = Instant::now();
        let task_id = &task.task_id;

        let startup = jitter(self.policy.startup_delay);
        if !startup.is_zero() {
            debug!(task_id = %task_id, "Startup delay {:?}", startup);
            if !sleep_unless_cancelled(startup, cancel).await {
                return cancelled(task, "batch interrupted before the first attempt", 0, Metrics::new(), started);
            }
        }
        if cancel.is_cancelled() {
            return cancelled(task, "batch interrupted before the first attempt", 0, Metrics::new(), started);
        }

        let mut last_error = AttemptError::Action("no attempt was made".to_string());
        let mut last_metrics = Metrics::new();

        for attempt in 0..=task.max_retries {
            if attempt > 0 {
                let delay = jitter(self.policy.retry_delay);
                warn!(
                    task_id = %task_id,
                    "Attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt,
                    task.max_attempts(),
                    last_error,
                    delay
                );
                if !sleep_unless_cancelled(delay, cancel).await {
                    let reason = format!("batch interrupted after {attempt} attempt(s), last error: {last_error}");
                    return cancelled(task, &reason, attempt - 1, last_metrics, started);
                }
            }

            current_attempt.store(attempt, Ordering::SeqCst);
            match worker.attempt(&task.payload, task.headless).await {
                Ok(outcome) if outcome.success => {
                    info!(
                        task_id = %task_id,
                        "Task succeeded on attempt {}/{}",
                        attempt + 1,
                        task.max_attempts()
                    );
                    return TaskResult::succeeded(
                        task_id.clone(),
                        task.payload.clone(),
                        attempt,
                        outcome.metrics,
                        started.elapsed(),
                    );
                }
                Ok(outcome) => {
                    last_error = AttemptError::Unsuccessful(
                        outcome
                            .detail
                            .unwrap_or_else(|| "attempt reported no result".to_string()),
                    );
                    last_metrics = outcome.metrics;
                }
                Err(e) => last_error = e,
            }
        }

        warn!(
            task_id = %task_id,
            "Task failed after {} attempt(s): {}",
            task.max_attempts(),
            last_error
        );
        TaskResult::failed(
            task_id.clone(),
            task.payload.clone(),
            TaskFailure::exhausted(last_error.to_string()),
            task.max_retries,
            last_metrics,
            started.elapsed(),
        )
    }
}

/// Sleep for `delay`; returns `false` when the token fired first.
async fn sleep_unless_cancelled(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(delay) => !cancel.is_cancelled(),
    }
}

fn cancelled<P: Clone>(
    task: &TaskDescriptor<P>,
    reason: &str,
    retry_count: u32,
    metrics: Metrics,
    started: Instant,
) -> TaskResult<P> {
    info!(task_id = %task.task_id, "Task cancelled: {}", reason);
    TaskResult::failed(
        task.task_id.clone(),
        task.payload.clone(),
        TaskFailure::cancelled(reason),
        retry_count,
        metrics,
        started.elapsed(),
    )
}
