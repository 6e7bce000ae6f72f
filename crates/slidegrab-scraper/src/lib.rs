//! Slidegrab Scraper - category listing extraction.
//!
//! Opens a category page, finds the requested section ("Featured in",
//! "Most popular in", "New in"), keeps pressing "Show More" until enough
//! presentations are collected, and writes them to a CSV file.
//!
//! # Example
//!
//! ```rust,ignore
//! use slidegrab_scraper::{ListingAction, ListingJob};
//!
//! let action = ListingAction::new(config.scraping.clone(), Duration::from_secs(30))?;
//! let outcome = action.scrape(&job, &session).await?;
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod action;
pub mod collector;
pub mod error;
pub mod output;
pub mod parser;

// Re-export commonly used types
pub use action::{ListingAction, ListingJob};
pub use collector::{ItemCollector, ListingRow};
pub use error::{Result, ScrapeError};
pub use output::write_listing_csv;
pub use parser::{extract_category, ItemValidator, ListingItem, ListingParser, SectionListing};
