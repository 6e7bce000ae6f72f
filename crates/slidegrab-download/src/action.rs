//! The "download slides" domain action.

use crate::convert::{existing_slide, save_slide};
use crate::error::{DownloadError, Result};
use crate::fetch::{fetch_with_retries, ImageSource};
use crate::page::{extract_slide_images, extract_title, SLIDE_IMAGE_SELECTOR};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slidegrab_browser::{BrowserActions, BrowserError};
use slidegrab_core::naming::{presentation_dir, sanitize_filename, slide_path, title_from_url, UNKNOWN};
use slidegrab_core::DownloadConfig;
use slidegrab_pool::{DomainAction, Metrics, WorkOutcome};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Backoff base between image fetch attempts
const FETCH_BACKOFF: Duration = Duration::from_secs(1);

/// One presentation to download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideJob {
    /// 1-based row in the listing CSV
    pub index: usize,
    pub url: String,
    pub title: String,
    pub output_dir: PathBuf,
}

impl SlideJob {
    fn has_title(&self) -> bool {
        let title = self.title.trim();
        !title.is_empty() && sanitize_filename(title) != UNKNOWN
    }
}

/// Downloads every slide of one presentation page.
pub struct SlideAction<I: ImageSource> {
    config: DownloadConfig,
    source: Arc<I>,
    element_wait: Duration,
    page_settle: Duration,
    fetch_backoff: Duration,
}

impl<I: ImageSource> SlideAction<I> {
    pub fn new(config: DownloadConfig, source: Arc<I>, element_wait: Duration) -> Self {
        Self {
            config,
            source,
            element_wait,
            page_settle: Duration::from_secs(2),
            fetch_backoff: FETCH_BACKOFF,
        }
    }

    #[must_use]
    pub fn with_page_settle(mut self, settle: Duration) -> Self {
        self.page_settle = settle;
        self
    }

    /// Override the base of the per-image exponential backoff.
    #[must_use]
    pub fn with_fetch_backoff(mut self, base: Duration) -> Self {
        self.fetch_backoff = base;
        self
    }

    fn resolve_title(job: &SlideJob, html: &str) -> String {
        if job.has_title() {
            return job.title.trim().to_string();
        }
        match extract_title(html) {
            Some(title) => {
                debug!("Title from page: {}", title);
                title
            }
            None => title_from_url(&job.url),
        }
    }

    pub async fn download<S: BrowserActions + ?Sized>(&self, job: &SlideJob, page: &S) -> Result<WorkOutcome> {
        info!("Processing #{}: {}", job.index, job.url);

        page.navigate(&job.url).await?;
        if !self.page_settle.is_zero() {
            tokio::time::sleep(self.page_settle).await;
        }

        let wait_ms = u64::try_from(self.element_wait.as_millis()).unwrap_or(u64::MAX);
        match page.wait_for_selector(SLIDE_IMAGE_SELECTOR, wait_ms).await {
            Ok(()) => {}
            Err(BrowserError::Timeout(_)) => {
                warn!("#{}: no slide images appeared on {}", job.index, job.url);
                return Ok(WorkOutcome::unsuccessful(
                    "no slide images found",
                    Metrics::new().with("slides_total", 0).with("slides_downloaded", 0),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        let html = page.content().await?;
        let title = Self::resolve_title(job, &html);
        let dir = presentation_dir(&job.output_dir, job.index, &title);
        std::fs::create_dir_all(&dir)?;

        let slides = extract_slide_images(&html);
        info!("#{}: {} slide(s) in '{}'", job.index, slides.len(), title);

        let mut downloaded: u64 = 0;
        for slide in &slides {
            let target = slide_path(&dir, &title, slide.number);
            if let Some(existing) = existing_slide(&target) {
                debug!("Already have {}", existing.display());
                downloaded += 1;
                continue;
            }

            match self.fetch_and_save(&slide.url, &job.url, &target).await {
                Ok(path) => {
                    debug!("Slide {} -> {}", slide.number, path.display());
                    downloaded += 1;
                }
                Err(e) => warn!("#{}: slide {} failed: {}", job.index, slide.number, e),
            }

            if self.config.download_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.download_delay_ms)).await;
            }
        }

        let total = u64::try_from(slides.len()).unwrap_or(u64::MAX);
        let metrics = Metrics::new()
            .with("slides_total", total)
            .with("slides_downloaded", downloaded);

        if downloaded == 0 {
            return Ok(WorkOutcome::unsuccessful(
                format!("no slides downloaded ({total} found)"),
                metrics,
            ));
        }

        info!("#{}: {}/{} slide(s) saved to {}", job.index, downloaded, total, dir.display());
        Ok(WorkOutcome::success(metrics.with("presentations", 1)))
    }

    async fn fetch_and_save(&self, url: &str, referer: &str, target: &std::path::Path) -> Result<PathBuf> {
        let image = fetch_with_retries(
            self.source.as_ref(),
            url,
            referer,
            self.config.image_retries,
            self.fetch_backoff,
        )
        .await?;

        let target = target.to_path_buf();
        let quality = self.config.jpeg_quality;
        tokio::task::spawn_blocking(move || {
            save_slide(&image.bytes, image.content_type.as_deref(), &target, quality)
        })
        .await
        .map_err(|e| DownloadError::Io(std::io::Error::other(e)))?
    }
}

#[async_trait]
impl<S, I> DomainAction<S> for SlideAction<I>
where
    S: BrowserActions + 'static,
    I: ImageSource,
{
    type Payload = SlideJob;
    type Error = DownloadError;

    async fn perform(&self, job: &SlideJob, session: &mut S) -> Result<WorkOutcome> {
        self.download(job, &*session).await
    }
}
