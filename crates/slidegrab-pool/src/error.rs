use thiserror::Error;

/// Errors raised by the pool itself, before any task runs.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("no tasks to run: {0}")]
    NoTasks(String),
}

/// Why a single attempt failed.
///
/// Every variant is retryable; the Retry Coordinator decides when to stop.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptError {
    #[error("session error: {0}")]
    Session(String),

    #[error("{0}")]
    Action(String),

    #[error("unsuccessful: {0}")]
    Unsuccessful(String),
}

pub type Result<T> = std::result::Result<T, PoolError>;
