//! Configuration management for slidegrab.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/slidegrab/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Worker pool and retry settings
    pub pool: PoolConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Listing scrape settings
    pub scraping: ScrapingConfig,
    /// Slide download settings
    pub download: DownloadConfig,
    /// Output directory layout
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path.
    ///
    /// Unlike [`AppConfig::load`], a missing file is an error here.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }
        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `SLIDEGRAB_HEADLESS`: Override browser headless mode (true/false)
    /// - `SLIDEGRAB_CONCURRENCY`: Override the pool size
    /// - `SLIDEGRAB_MAX_RETRIES`: Override the per-task retry budget
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("SLIDEGRAB_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("SLIDEGRAB_CONCURRENCY") {
            if let Ok(concurrency) = val.parse() {
                self.pool.concurrency = concurrency;
                tracing::debug!("Override pool.concurrency from env: {}", concurrency);
            }
        }

        if let Ok(val) = std::env::var("SLIDEGRAB_MAX_RETRIES") {
            if let Ok(max_retries) = val.parse() {
                self.pool.max_retries = max_retries;
                tracing::debug!("Override pool.max_retries from env: {}", max_retries);
            }
        }

        self
    }

    /// Load configuration (explicit path or XDG default) with environment
    /// overrides applied and values validated.
    pub fn resolve(path: Option<&Path>) -> ConfigResult<Self> {
        let config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        }
        .with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pool and downloader cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.pool.concurrency == 0 {
            return Err(invalid("pool.concurrency", "must be at least 1"));
        }
        if self.pool.retry_batch_concurrency == 0 {
            return Err(invalid("pool.retry_batch_concurrency", "must be at least 1"));
        }
        if self.pool.startup_delay_ms[0] > self.pool.startup_delay_ms[1] {
            return Err(invalid("pool.startup_delay_ms", "lower bound exceeds upper bound"));
        }
        if self.pool.retry_delay_ms[0] > self.pool.retry_delay_ms[1] {
            return Err(invalid("pool.retry_delay_ms", "lower bound exceeds upper bound"));
        }
        if !(1..=100).contains(&self.download.jpeg_quality) {
            return Err(invalid("download.jpeg_quality", "must be within 1..=100"));
        }
        if self.scraping.min_title_len > self.scraping.max_title_len {
            return Err(invalid("scraping.min_title_len", "exceeds max_title_len"));
        }
        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| invalid("config_path", "no parent directory"))?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/slidegrab/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("net", "slidegrab", "slidegrab").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Worker pool and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of concurrently active workers (browser windows)
    pub concurrency: usize,
    /// Retries per task after the first attempt
    pub max_retries: u32,
    /// Jitter range before the first attempt, `[min, max]` in milliseconds
    pub startup_delay_ms: [u64; 2],
    /// Jitter range between attempts, `[min, max]` in milliseconds
    pub retry_delay_ms: [u64; 2],
    /// Upper bound on the pool size of a retry batch
    pub retry_batch_concurrency: usize,
    /// Minimum retry budget given to tasks in a retry batch
    pub retry_batch_max_retries: u32,
}

impl PoolConfig {
    /// Startup jitter range as durations.
    #[must_use]
    pub fn startup_delay(&self) -> (Duration, Duration) {
        millis_pair(self.startup_delay_ms)
    }

    /// Retry jitter range as durations.
    #[must_use]
    pub fn retry_delay(&self) -> (Duration, Duration) {
        millis_pair(self.retry_delay_ms)
    }
}

fn millis_pair([min, max]: [u64; 2]) -> (Duration, Duration) {
    (Duration::from_millis(min), Duration::from_millis(max))
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            max_retries: 2,
            startup_delay_ms: [0, 3_000],
            retry_delay_ms: [5_000, 15_000],
            retry_batch_concurrency: 2,
            retry_batch_max_retries: 3,
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// User agent; a randomised desktop agent is used when empty
    pub user_agent: String,
    /// Page load timeout in seconds
    pub page_load_timeout_secs: u64,
    /// Maximum wait for an expected element in seconds
    pub element_wait_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            window_width: 1920,
            window_height: 1080,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            page_load_timeout_secs: 60,
            element_wait_secs: 30,
        }
    }
}

/// Listing scrape settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Site root
    pub base_url: String,
    /// Items to collect per category/section
    pub download_num: usize,
    /// Wait after clicking "Show More" in milliseconds
    pub show_more_delay_ms: u64,
    /// Wait after the listing page loads in milliseconds
    pub page_settle_ms: u64,
    /// Consecutive extraction failures before giving up on a page
    pub max_consecutive_errors: u32,
    /// Shortest accepted item title
    pub min_title_len: usize,
    /// Longest accepted item title
    pub max_title_len: usize,
    /// Substring every item URL must contain
    pub required_url_part: String,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.slideshare.net".to_string(),
            download_num: 100,
            show_more_delay_ms: 3_000,
            page_settle_ms: 5_000,
            max_consecutive_errors: 3,
            min_title_len: 5,
            max_title_len: 200,
            required_url_part: "slideshare.net".to_string(),
        }
    }
}

/// Slide download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Parallel presentation downloads
    pub workers: usize,
    /// Pause between two image downloads in milliseconds
    pub download_delay_ms: u64,
    /// Attempts per image before it is skipped
    pub image_retries: u32,
    /// JPEG quality for converted slides
    pub jpeg_quality: u8,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            download_delay_ms: 1_000,
            image_retries: 3,
            jpeg_quality: 95,
            request_timeout_secs: 30,
        }
    }
}

/// Output directory layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root of listing runs (CSV files)
    pub url_dir: PathBuf,
    /// Root of downloaded slides
    pub slides_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            url_dir: PathBuf::from("output_url"),
            slides_dir: PathBuf::from("output"),
        }
    }
}
