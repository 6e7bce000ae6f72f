use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use slidegrab_core::BrowserConfig;
use slidegrab_pool::SessionFactory;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Time allowed for the event handler to drain after the browser closes
const HANDLER_SHUTDOWN: Duration = Duration::from_secs(5);

/// One Chromium process with a single page, owned by one task attempt
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    pub(crate) page: Page,
    pub(crate) page_load_timeout: Duration,
    // Removed when the session is dropped
    _profile: TempDir,
}

/// Launches an independent Chromium for every session
#[derive(Debug, Clone)]
pub struct BrowserSessionFactory {
    config: BrowserConfig,
}

impl BrowserSessionFactory {
    /// Create a factory from the `[browser]` config section
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    /// Launch a session
    pub async fn launch(&self, headless: bool) -> Result<BrowserSession> {
        let fingerprint = FingerprintConfig::from_config(&self.config);
        let profile = tempfile::Builder::new()
            .prefix("slidegrab-chrome-")
            .tempdir()
            .map_err(|e| BrowserError::ChromiumError(format!("profile directory: {e}")))?;
        let page_load_timeout = Duration::from_secs(self.config.page_load_timeout_secs);

        let mut builder = CdpConfig::builder()
            .no_sandbox()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .viewport(None)
            .user_data_dir(profile.path())
            .request_timeout(page_load_timeout)
            .arg(format!("--user-agent={}", fingerprint.user_agent))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-notifications")
            .arg("--lang=en-US");
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (mut browser, mut handler) = Browser::launch(config).await?;

        // CDP events must be polled for the page API to make progress
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser event error: {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler.abort();
                return Err(e.into());
            }
        };

        debug!(
            "Browser launched (headless: {}, window: {}x{})",
            headless, fingerprint.viewport_width, fingerprint.viewport_height
        );

        Ok(BrowserSession {
            browser,
            handler,
            page,
            page_load_timeout,
            _profile: profile,
        })
    }

    /// Close the browser and join its event handler
    pub async fn close(&self, session: BrowserSession) {
        let BrowserSession {
            mut browser,
            mut handler,
            page,
            ..
        } = session;

        if let Err(e) = page.close().await {
            debug!("Page close failed: {}", e);
        }
        if let Err(e) = browser.close().await {
            warn!("Browser close failed: {}", e);
        }
        if let Err(e) = browser.wait().await {
            warn!("Browser process did not exit cleanly: {}", e);
        }
        if tokio::time::timeout(HANDLER_SHUTDOWN, &mut handler).await.is_err() {
            handler.abort();
        }
    }

    /// Launch and release one headless session so a missing or broken
    /// browser install surfaces once before a parallel batch starts
    pub async fn warm_up(&self) -> Result<()> {
        info!("Warming up browser");
        let session = self.launch(true).await?;
        self.close(session).await;
        info!("Browser warm-up complete");
        Ok(())
    }
}

#[async_trait]
impl SessionFactory for BrowserSessionFactory {
    type Session = BrowserSession;
    type Error = BrowserError;

    async fn create_session(&self, headless: bool) -> Result<BrowserSession> {
        self.launch(headless).await
    }

    async fn release(&self, session: BrowserSession) {
        self.close(session).await;
    }
}
