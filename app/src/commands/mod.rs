//! Subcommand handlers and the plumbing they share.

pub mod info;
pub mod slides;
pub mod urls;

use slidegrab_browser::BrowserSessionFactory;
use slidegrab_core::AppConfig;
use slidegrab_pool::{BatchRunner, ProgressEvent, ProgressHook, RetryBatchPolicy, RetryPolicy};
use std::future::Future;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Exit status after a forced interrupt (128 + SIGINT).
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Token cancelled on the first Ctrl-C. A second Ctrl-C exits the process
/// with [`INTERRUPTED_EXIT_CODE`].
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    tokio::spawn(handle_interrupts(
        || async { tokio::signal::ctrl_c().await.is_ok() },
        token.clone(),
        || std::process::exit(INTERRUPTED_EXIT_CODE),
    ));
    token
}

/// `next_signal` resolves `true` per interrupt, `false` once no more can
/// arrive. The first interrupt cancels `token`, the second runs `force_quit`.
async fn handle_interrupts<S, F, Q>(mut next_signal: S, token: CancellationToken, force_quit: Q)
where
    S: FnMut() -> F,
    F: Future<Output = bool>,
    Q: FnOnce(),
{
    if !next_signal().await {
        return;
    }
    warn!("Interrupted: letting running attempts finish, no new tasks will start (Ctrl-C again to quit)");
    token.cancel();

    if next_signal().await {
        warn!("Interrupted again, exiting");
        force_quit();
    }
}

/// Batch runner configured from `[pool]`, logging progress.
pub fn batch_runner(config: &AppConfig, cancel: CancellationToken) -> BatchRunner {
    let policy = RetryPolicy {
        startup_delay: config.pool.startup_delay(),
        retry_delay: config.pool.retry_delay(),
    };
    let progress: ProgressHook = Arc::new(|event: &ProgressEvent| info!("{}", event));
    BatchRunner::new(policy)
        .with_cancellation(cancel)
        .with_progress(progress)
}

pub fn retry_policy(config: &AppConfig, headless: bool) -> RetryBatchPolicy {
    RetryBatchPolicy {
        concurrency_cap: config.pool.retry_batch_concurrency.max(1),
        min_max_retries: config.pool.retry_batch_max_retries,
        headless,
    }
}

/// Launch one throwaway browser before a parallel batch. Failure is only
/// logged.
pub async fn warm_up_if_parallel(factory: &BrowserSessionFactory, concurrency: usize, tasks: usize) {
    if concurrency.min(tasks) <= 1 {
        return;
    }
    if let Err(e) = factory.warm_up().await {
        warn!("Browser warm-up failed, continuing anyway: {}", e);
    }
}

/// Decide whether to resubmit `failures` failed tasks. Asks on stdin when
/// no flag decided it.
pub async fn should_retry(decision: Option<bool>, failures: usize, cancel: &CancellationToken) -> bool {
    if failures == 0 || cancel.is_cancelled() {
        return false;
    }
    if let Some(decision) = decision {
        return decision;
    }

    let prompt = tokio::task::spawn_blocking(prompt_retry);
    tokio::select! {
        answer = prompt => answer.unwrap_or(false) && !cancel.is_cancelled(),
        () = cancel.cancelled() => {
            // The blocking stdin read cannot be abandoned cleanly.
            warn!("Interrupted at the retry prompt, exiting");
            std::process::exit(INTERRUPTED_EXIT_CODE)
        }
    }
}

fn prompt_retry() -> bool {
    print!("\nRetry failed tasks? (y/n): ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => parse_answer(&line),
        Err(_) => false,
    }
}

fn parse_answer(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    #[test]
    fn test_parse_answer() {
        assert!(parse_answer("y\n"));
        assert!(parse_answer(" YES "));
        assert!(!parse_answer("n"));
        assert!(!parse_answer(""));
    }

    #[tokio::test]
    async fn test_should_retry_flags_and_cancellation() {
        let cancel = CancellationToken::new();
        assert!(should_retry(Some(true), 2, &cancel).await);
        assert!(!should_retry(Some(false), 2, &cancel).await);
        assert!(!should_retry(Some(true), 0, &cancel).await);

        cancel.cancel();
        assert!(!should_retry(Some(true), 2, &cancel).await);
    }

    type Signal = Pin<Box<dyn Future<Output = bool> + Send>>;

    /// Signal source fed by adding permits; closing it ends the stream.
    fn signal_source(permits: &Arc<Semaphore>) -> impl (FnMut() -> Signal) + Send + 'static {
        let source = Arc::clone(permits);
        move || -> Signal {
            let source = Arc::clone(&source);
            Box::pin(async move { source.acquire().await.map(|p| p.forget()).is_ok() })
        }
    }

    #[tokio::test]
    async fn test_second_interrupt_forces_quit() {
        let permits = Arc::new(Semaphore::new(0));
        let next_signal = signal_source(&permits);
        let token = CancellationToken::new();
        let forced = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&forced);

        let handler = tokio::spawn(handle_interrupts(next_signal, token.clone(), move || {
            flag.store(true, Ordering::SeqCst);
        }));

        permits.add_permits(1);
        tokio::time::timeout(Duration::from_secs(5), token.cancelled())
            .await
            .unwrap();
        assert!(!forced.load(Ordering::SeqCst));

        permits.add_permits(1);
        tokio::time::timeout(Duration::from_secs(5), handler)
            .await
            .unwrap()
            .unwrap();
        assert!(forced.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_closed_signal_source_cancels_nothing() {
        let permits = Arc::new(Semaphore::new(0));
        let next_signal = signal_source(&permits);
        let token = CancellationToken::new();
        permits.close();

        handle_interrupts(next_signal, token.clone(), || panic!("must not quit")).await;
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = AppConfig::default();
        let policy = retry_policy(&config, true);
        assert_eq!(policy.concurrency_cap, 2);
        assert_eq!(policy.min_max_retries, 3);
        assert!(policy.headless);
    }
}
