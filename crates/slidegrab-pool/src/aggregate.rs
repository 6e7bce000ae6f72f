//! Result Aggregator.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::task::{Metrics, TaskResult};

/// Counts and summed metrics for one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Sum of every result's metrics
    pub metrics: Metrics,
    pub elapsed_secs: f64,
    /// Batch-level failure, e.g. no tasks could be built
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchSummary {
    /// Empty summary describing a batch that could not run.
    pub fn errored(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Percentage of successful tasks; zero for an empty batch.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let rate = self.succeeded as f64 / self.total as f64 * 100.0;
            rate
        }
    }
}

/// Summarize `results` and split out the failures, payloads included.
///
/// Pure: the same input always yields the same output.
pub fn aggregate<P: Clone>(results: &[TaskResult<P>], elapsed: Duration) -> (BatchSummary, Vec<TaskResult<P>>) {
    let mut summary = BatchSummary {
        total: results.len(),
        elapsed_secs: elapsed.as_secs_f64(),
        ..BatchSummary::default()
    };

    let mut failures = Vec::new();
    for result in results {
        summary.metrics.merge(&result.metrics);
        if result.success {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
            failures.push(result.clone());
        }
    }

    (summary, failures)
}
