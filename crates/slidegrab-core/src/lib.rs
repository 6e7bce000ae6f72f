//! slidegrab core - foundation crate for the slidegrab scraper.
//!
//! This crate provides shared types, error handling, configuration management
//! and the on-disk naming rules that all other slidegrab crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Selection and configuration errors
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Listing categories and sections
//! - [`naming`] - Canonical file and directory names for scraped output
//!
//! # Example
//!
//! ```rust
//! use slidegrab_core::{AppConfig, Category, Section};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let category = Category::new("technology")?;
//! let url = category.url(&config.scraping.base_url);
//! assert_eq!(url, "https://www.slideshare.net/category/technology");
//! assert_eq!(Section::Popular.heading_pattern(), "Most popular in");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod naming;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, DownloadConfig, OutputConfig, PoolConfig, ScrapingConfig,
};
pub use error::{ConfigError, ConfigResult, SlidegrabError};
pub use types::{Category, Section, SUPPORTED_CATEGORIES};
