use crate::engine::BrowserSession;
use crate::error::{BrowserError, Result};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;

/// How often `wait_for_selector` re-queries the DOM
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Browser actions for automation
#[async_trait]
pub trait BrowserActions: Send + Sync {
    /// Navigate to a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Wait for a selector to appear
    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()>;

    /// Serialized HTML of the current document
    async fn content(&self) -> Result<String>;

    /// Evaluate a script that yields a boolean
    async fn evaluate_bool(&self, script: &str) -> Result<bool>;
}

/// Helper to extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {e}")))?;

    url.host_str()
        .ok_or_else(|| BrowserError::NavigationError("No host in URL".to_string()))
        .map(ToString::to_string)
}

#[async_trait]
impl BrowserActions for BrowserSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        let domain = extract_domain(url)?;
        debug!("Navigating to {} ({})", url, domain);

        match tokio::time::timeout(self.page_load_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::NavigationError(format!("{url}: {e}"))),
            Err(_) => Err(BrowserError::Timeout(format!(
                "loading {url} took longer than {}s",
                self.page_load_timeout.as_secs()
            ))),
        }
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "{selector} did not appear within {timeout_ms}ms"
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn content(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn evaluate_bool(&self, script: &str) -> Result<bool> {
        self.page
            .evaluate(script)
            .await?
            .into_value::<bool>()
            .map_err(|e| BrowserError::ScriptError(e.to_string()))
    }
}
