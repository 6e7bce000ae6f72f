//! Slidegrab Pool - bounded concurrent task execution.
//!
//! This crate runs batches of independent, I/O-bound tasks (listing scrapes,
//! slide downloads) under a fixed concurrency limit, retries each task with
//! jittered backoff, isolates failures and crashes per task, and aggregates
//! the results into a summary plus a resubmittable failure list.
//!
//! # Features
//!
//! - Semaphore-bounded fan-out on the multi-threaded tokio runtime
//! - At most one session per in-flight attempt, released on every exit path
//! - Panics in a worker become failed results tagged `internal fault:`
//! - Cooperative cancellation between attempts
//! - Retry-batch escalation with relabelled tasks and reduced concurrency
//!
//! # Example
//!
//! ```rust,ignore
//! use slidegrab_pool::{BatchRunner, RetryPolicy, TaskDescriptor, WorkerUnit};
//! use std::sync::Arc;
//!
//! let worker = Arc::new(WorkerUnit::new(Arc::new(factory), Arc::new(action)));
//! let tasks = jobs
//!     .into_iter()
//!     .enumerate()
//!     .map(|(i, job)| TaskDescriptor::new(i + 1, job, 2, true))
//!     .collect();
//!
//! let report = BatchRunner::new(RetryPolicy::default())
//!     .run_batch(worker, tasks, 4)
//!     .await;
//! println!("{}/{} succeeded", report.summary.succeeded, report.summary.total);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod aggregate;
#[allow(missing_docs)]
pub mod batch;
#[allow(missing_docs)]
pub mod error;
pub mod executor;
pub mod retry;
pub mod task;
pub mod worker;

// Re-export commonly used types
pub use aggregate::{aggregate, BatchSummary};
pub use batch::{retry_tasks, BatchReport, BatchRunner, RetryBatchPolicy};
pub use error::{AttemptError, PoolError, Result};
pub use executor::{BoundedPool, ProgressEvent, ProgressHook};
pub use retry::{RetryCoordinator, RetryPolicy};
pub use task::{FailureKind, Metrics, TaskDescriptor, TaskFailure, TaskId, TaskResult, WorkOutcome};
pub use worker::{DomainAction, SessionFactory, Worker, WorkerUnit};
