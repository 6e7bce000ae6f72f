//! Shared types used across slidegrab.
//!
//! Listing pages are addressed by a category slug and one of three
//! sections rendered on every category page.

use crate::error::SlidegrabError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Keyword that expands a category or section argument to every value.
pub const ALL: &str = "all";

/// Category slugs the listing site serves under `/category/{slug}`.
pub const SUPPORTED_CATEGORIES: &[&str] = &[
    "business",
    "mobile",
    "social-media",
    "marketing",
    "technology",
    "art-photos",
    "career",
    "design",
    "education",
    "presentations-public-speaking",
    "government-nonprofit",
    "healthcare",
    "internet",
    "law",
    "leadership-management",
    "automotive",
    "engineering",
    "software",
    "recruiting-hr",
    "retail",
    "sales",
    "services",
    "science",
    "small-business-entrepreneurship",
    "food",
    "environment",
    "economy-finance",
    "data-analytics",
    "investor-relations",
    "sports",
    "spiritual",
    "news-politics",
    "travel",
    "self-improvement",
    "real-estate",
    "entertainment-humor",
    "health-medicine",
    "devices-hardware",
    "lifestyle",
];

/// Newtype for listing categories.
///
/// Only slugs from [`SUPPORTED_CATEGORIES`] are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category(String);

impl Category {
    /// Create a new `Category` from a slug.
    ///
    /// # Errors
    /// Returns error if the slug is not a supported category.
    pub fn new(slug: impl Into<String>) -> Result<Self, SlidegrabError> {
        let slug = slug.into();
        if SUPPORTED_CATEGORIES.contains(&slug.as_str()) {
            Ok(Self(slug))
        } else {
            Err(SlidegrabError::UnknownCategory(slug))
        }
    }

    /// Every supported category, in listing order.
    #[must_use]
    pub fn all() -> Vec<Self> {
        SUPPORTED_CATEGORIES
            .iter()
            .map(|slug| Self((*slug).to_string()))
            .collect()
    }

    /// Parse a command-line value, expanding `all`.
    pub fn parse_selection(value: &str) -> Result<Vec<Self>, SlidegrabError> {
        if value == ALL {
            Ok(Self::all())
        } else {
            Ok(vec![Self::new(value)?])
        }
    }

    /// Get the inner slug.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Listing page URL for this category under `base_url`.
    #[must_use]
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/category/{}", base_url.trim_end_matches('/'), self.0)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A section block on a category page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// "Featured in {Category}"
    Featured,
    /// "Most popular in {Category}"
    Popular,
    /// "New in {Category}"
    New,
}

impl Section {
    /// All sections in page order.
    pub const ALL: [Section; 3] = [Section::Featured, Section::Popular, Section::New];

    /// Lowercase name used on the command line.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::Popular => "popular",
            Self::New => "new",
        }
    }

    /// Capitalised name used in output file names.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Featured => "Featured",
            Self::Popular => "Popular",
            Self::New => "New",
        }
    }

    /// Text that prefixes the section heading on the page.
    #[must_use]
    pub fn heading_pattern(&self) -> &'static str {
        match self {
            Self::Featured => "Featured in",
            Self::Popular => "Most popular in",
            Self::New => "New in",
        }
    }

    /// Parse a command-line value, expanding `all`.
    pub fn parse_selection(value: &str) -> Result<Vec<Self>, SlidegrabError> {
        if value == ALL {
            Ok(Self::ALL.to_vec())
        } else {
            Ok(vec![value.parse()?])
        }
    }
}

impl FromStr for Section {
    type Err = SlidegrabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "featured" => Ok(Self::Featured),
            "popular" => Ok(Self::Popular),
            "new" => Ok(Self::New),
            other => Err(SlidegrabError::UnknownSection(other.to_string())),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
