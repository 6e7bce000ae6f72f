//! Slide image retrieval over HTTP.

use crate::error::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, REFERER};
use slidegrab_browser::FingerprintConfig;
use slidegrab_core::{BrowserConfig, DownloadConfig};
use std::time::Duration;
use tracing::{debug, warn};

/// Body and declared type of a fetched image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Where slide images come from.
#[async_trait]
pub trait ImageSource: Send + Sync + 'static {
    /// Fetch one image. `referer` is the presentation page URL.
    async fn fetch(&self, url: &str, referer: &str) -> Result<FetchedImage>;
}

/// Fetches images with browser-like headers and the browser's user agent.
#[derive(Debug, Clone)]
pub struct HttpImageSource {
    client: reqwest::Client,
}

impl HttpImageSource {
    pub fn new(browser: &BrowserConfig, download: &DownloadConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("image/avif,image/webp,image/apng,image/*,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .user_agent(FingerprintConfig::from_config(browser).user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(download.request_timeout_secs))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch(&self, url: &str, referer: &str) -> Result<FetchedImage> {
        let response = self
            .client
            .get(url)
            .header(REFERER, referer)
            .send()
            .await?
            .error_for_status()?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();

        debug!("Fetched {} ({} bytes)", url, bytes.len());
        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}

/// Delay before retry `attempt` (0-based): `base * 2^attempt`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// Fetch with up to `attempts` tries and exponential backoff between them.
pub async fn fetch_with_retries<I: ImageSource + ?Sized>(
    source: &I,
    url: &str,
    referer: &str,
    attempts: u32,
    backoff_base: Duration,
) -> Result<FetchedImage> {
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        match source.fetch(url, referer).await {
            Ok(image) => return Ok(image),
            Err(e) if attempt + 1 >= attempts => return Err(e),
            Err(e) => {
                let delay = backoff_delay(backoff_base, attempt);
                warn!(
                    "Image download failed (attempt {}/{}): {}. Retrying in {:?}",
                    attempt + 1,
                    attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
