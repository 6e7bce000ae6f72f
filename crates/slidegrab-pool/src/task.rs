//! Task descriptors, work outcomes and task results.
//!
//! A [`TaskDescriptor`] is immutable once submitted. A [`TaskResult`] is
//! produced exactly once per descriptor, by the retry coordinator or by the
//! executor when a worker crashes, and is never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Opaque task identifier, unique within a batch.
///
/// Used for log correlation and report sorting only; it carries no
/// scheduling meaning.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Create a task id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for TaskId {
    fn from(id: usize) -> Self {
        Self(id.to_string())
    }
}

impl From<u32> for TaskId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One unit of work submitted to the pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDescriptor<P> {
    /// Correlation id
    pub task_id: TaskId,
    /// Work-specific parameters
    pub payload: P,
    /// Retries allowed after the first attempt
    pub max_retries: u32,
    /// Whether the browser session for this task runs without a window
    pub headless: bool,
}

impl<P> TaskDescriptor<P> {
    /// Create a descriptor with the given retry budget.
    pub fn new(task_id: impl Into<TaskId>, payload: P, max_retries: u32, headless: bool) -> Self {
        Self {
            task_id: task_id.into(),
            payload,
            max_retries,
            headless,
        }
    }

    /// Override the retry budget.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Total attempts this task may consume.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Named outcome counters (items scraped, slides downloaded, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metrics(BTreeMap<String, u64>);

impl Metrics {
    /// Empty counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style counter assignment.
    #[must_use]
    pub fn with(mut self, key: &str, value: u64) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    /// Add `value` to counter `key`.
    pub fn add(&mut self, key: &str, value: u64) {
        *self.0.entry(key.to_string()).or_insert(0) += value;
    }

    /// Add every counter of `other` into `self`.
    pub fn merge(&mut self, other: &Metrics) {
        for (key, value) in &other.0 {
            self.add(key, *value);
        }
    }

    /// Read a counter; absent counters read as zero.
    #[must_use]
    pub fn get(&self, key: &str) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    /// Iterate counters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Whether no counter has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What a domain action reports for one attempt.
///
/// `success == false` is an ordinary, retryable failure (e.g. the expected
/// output file was not produced); raised errors are reserved for network or
/// browser faults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkOutcome {
    /// Whether the attempt produced what it was supposed to
    pub success: bool,
    /// Outcome counters
    pub metrics: Metrics,
    /// Why an unsuccessful attempt failed
    pub detail: Option<String>,
}

impl WorkOutcome {
    /// Successful outcome.
    #[must_use]
    pub fn success(metrics: Metrics) -> Self {
        Self {
            success: true,
            metrics,
            detail: None,
        }
    }

    /// Unsuccessful outcome with a reason.
    #[must_use]
    pub fn unsuccessful(detail: impl Into<String>, metrics: Metrics) -> Self {
        Self {
            success: false,
            metrics,
            detail: Some(detail.into()),
        }
    }
}

/// Why a task ended up failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Retry budget exhausted on ordinary attempt failures
    Exhausted,
    /// The worker panicked; a defect rather than a domain failure
    Internal,
    /// The batch was cancelled before the task could finish
    Cancelled,
}

/// Descriptive error attached to a failed task result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    /// Failure class
    pub kind: FailureKind,
    /// Last attempt's failure description
    pub message: String,
}

impl TaskFailure {
    /// Retry budget exhausted.
    pub fn exhausted(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Exhausted,
            message: message.into(),
        }
    }

    /// Worker crash.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Internal,
            message: message.into(),
        }
    }

    /// Batch cancelled.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Cancelled,
            message: message.into(),
        }
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Exhausted => write!(f, "{}", self.message),
            FailureKind::Internal => write!(f, "internal fault: {}", self.message),
            FailureKind::Cancelled => write!(f, "cancelled: {}", self.message),
        }
    }
}

/// Outcome record of one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult<P> {
    /// Id of the originating descriptor
    pub task_id: TaskId,
    /// Original payload, kept so failures can be resubmitted
    pub payload: P,
    /// Whether the task succeeded
    pub success: bool,
    /// Present iff `success` is false
    pub error: Option<TaskFailure>,
    /// Attempts consumed minus one
    pub retry_count: u32,
    /// Counters of the successful attempt, or of the last failed one
    pub metrics: Metrics,
    /// Wall time from permit grant to result
    #[serde(rename = "elapsed_secs", with = "duration_secs")]
    pub elapsed: Duration,
}

impl<P> TaskResult<P> {
    /// Successful result.
    pub fn succeeded(
        task_id: TaskId,
        payload: P,
        retry_count: u32,
        metrics: Metrics,
        elapsed: Duration,
    ) -> Self {
        Self {
            task_id,
            payload,
            success: true,
            error: None,
            retry_count,
            metrics,
            elapsed,
        }
    }

    /// Failed result.
    pub fn failed(
        task_id: TaskId,
        payload: P,
        error: TaskFailure,
        retry_count: u32,
        metrics: Metrics,
        elapsed: Duration,
    ) -> Self {
        Self {
            task_id,
            payload,
            success: false,
            error: Some(error),
            retry_count,
            metrics,
            elapsed,
        }
    }

    /// Rendered error, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}
