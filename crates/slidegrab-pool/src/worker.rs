//! Worker Units: one task attempt, end to end.
//!
//! A [`WorkerUnit`] pairs a [`SessionFactory`] with a [`DomainAction`]. Each
//! attempt creates a fresh session, runs the action with exclusive access to
//! it, and releases it on every exit path, panics included.

use async_trait::async_trait;
use futures::FutureExt;
use std::fmt::Display;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::error::AttemptError;
use crate::task::WorkOutcome;

/// Creates and releases sessions. Must be safe to call concurrently; every
/// call to [`create_session`](SessionFactory::create_session) yields an
/// independent session.
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    /// Live session handle, owned by exactly one attempt.
    type Session: Send + 'static;
    /// Session creation failure.
    type Error: Display + Send + 'static;

    /// Create a new session.
    async fn create_session(&self, headless: bool) -> Result<Self::Session, Self::Error>;

    /// Release a session. Release failures are logged by the implementation,
    /// never surfaced.
    async fn release(&self, session: Self::Session);
}

/// The scrape or download performed with a caller-supplied session.
///
/// Returns `Err` on irrecoverable attempt failures and an unsuccessful
/// [`WorkOutcome`] when the attempt completed but produced nothing useful.
#[async_trait]
pub trait DomainAction<S: Send + 'static>: Send + Sync + 'static {
    /// Work-specific task parameters.
    type Payload: Clone + Send + Sync + 'static;
    /// Attempt failure.
    type Error: Display + Send + 'static;

    /// Perform one attempt.
    async fn perform(&self, payload: &Self::Payload, session: &mut S) -> Result<WorkOutcome, Self::Error>;
}

/// Anything that can run one attempt of a task.
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Work-specific task parameters.
    type Payload: Clone + Send + Sync + 'static;

    /// Run one attempt.
    async fn attempt(&self, payload: &Self::Payload, headless: bool) -> Result<WorkOutcome, AttemptError>;
}

/// Session-scoped execution of a domain action.
pub struct WorkerUnit<F, A> {
    factory: Arc<F>,
    action: Arc<A>,
}

impl<F, A> WorkerUnit<F, A>
where
    F: SessionFactory,
    A: DomainAction<F::Session>,
{
    /// Pair a factory with an action.
    pub fn new(factory: Arc<F>, action: Arc<A>) -> Self {
        Self { factory, action }
    }
}

#[async_trait]
impl<F, A> Worker for WorkerUnit<F, A>
where
    F: SessionFactory,
    A: DomainAction<F::Session>,
{
    type Payload = A::Payload;

    async fn attempt(&self, payload: &Self::Payload, headless: bool) -> Result<WorkOutcome, AttemptError> {
        let mut session = self
            .factory
            .create_session(headless)
            .await
            .map_err(|e| AttemptError::Session(e.to_string()))?;

        let outcome = AssertUnwindSafe(self.action.perform(payload, &mut session))
            .catch_unwind()
            .await;

        self.factory.release(session).await;

        match outcome {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) => Err(AttemptError::Action(e.to_string())),
            // Session is already released; let the executor classify the crash.
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Metrics;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingFactory {
        created: AtomicUsize,
        released: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SessionFactory for CountingFactory {
        type Session = u32;
        type Error = String;

        async fn create_session(&self, _headless: bool) -> Result<u32, String> {
            if self.fail {
                return Err("browser binary not found".to_string());
            }
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        }

        async fn release(&self, _session: u32) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    enum Behaviour {
        Succeed,
        Fail,
        Panic,
    }

    struct ScriptedAction(Behaviour);

    #[async_trait]
    impl DomainAction<u32> for ScriptedAction {
        type Payload = String;
        type Error = String;

        async fn perform(&self, _payload: &String, session: &mut u32) -> Result<WorkOutcome, String> {
            match self.0 {
                Behaviour::Succeed => Ok(WorkOutcome::success(
                    Metrics::new().with("session", u64::from(*session)),
                )),
                Behaviour::Fail => Err("element not found".to_string()),
                Behaviour::Panic => panic!("selector table corrupted"),
            }
        }
    }

    #[tokio::test]
    async fn test_session_released_after_success() {
        let factory = Arc::new(CountingFactory::default());
        let unit = WorkerUnit::new(Arc::clone(&factory), Arc::new(ScriptedAction(Behaviour::Succeed)));

        let outcome = unit.attempt(&"deck".to_string(), true).await.expect("attempt succeeds");
        assert!(outcome.success);
        assert_eq!(outcome.metrics.get("session"), 7);
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        assert_eq!(factory.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_session_released_after_error() {
        let factory = Arc::new(CountingFactory::default());
        let unit = WorkerUnit::new(Arc::clone(&factory), Arc::new(ScriptedAction(Behaviour::Fail)));

        let err = unit.attempt(&"deck".to_string(), true).await.unwrap_err();
        assert_eq!(err, AttemptError::Action("element not found".to_string()));
        assert_eq!(factory.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_session_released_after_panic() {
        let factory = Arc::new(CountingFactory::default());
        let unit = WorkerUnit::new(Arc::clone(&factory), Arc::new(ScriptedAction(Behaviour::Panic)));

        let result = AssertUnwindSafe(unit.attempt(&"deck".to_string(), true))
            .catch_unwind()
            .await;
        assert!(result.is_err());
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        assert_eq!(factory.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_session_creation_failure() {
        let factory = Arc::new(CountingFactory {
            fail: true,
            ..Default::default()
        });
        let unit = WorkerUnit::new(Arc::clone(&factory), Arc::new(ScriptedAction(Behaviour::Succeed)));

        let err = unit.attempt(&"deck".to_string(), false).await.unwrap_err();
        assert!(matches!(err, AttemptError::Session(_)));
        assert_eq!(factory.released.load(Ordering::SeqCst), 0);
    }
}
