use crate::error::{Result, ScrapeError};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use slidegrab_core::{ScrapingConfig, Section};
use tracing::debug;

pub const SECTION_SELECTOR: &str = "section";
pub const SECTION_TITLE_SELECTOR: &str = "h2";
pub const CARD_SELECTOR: &str = ".SlideshowCard_root__pD8t4";
pub const CARD_LINK_SELECTOR: &str = "a.SlideshowCardLink_root__p8KI7";
pub const CARD_TITLE_SELECTOR: &str = ".slideshow-title";
pub const SHOW_MORE_SELECTOR: &str = "button.ShowMoreButton_root__oAN_0";

/// One presentation card as rendered in a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingItem {
    pub title: String,
    pub url: String,
}

/// The requested section block of a category page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionListing {
    /// Category name taken from the heading, e.g. "Business"
    pub heading: String,
    pub items: Vec<ListingItem>,
    pub has_show_more: bool,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector(format!("{css}: {e}")))
}

/// Text after `pattern ` in a section heading.
///
/// `"Most popular in Technology"` with pattern `"Most popular in"` gives
/// `"Technology"`.
pub fn extract_category(title_text: &str, pattern: &str) -> Option<String> {
    let start = title_text.find(pattern)? + pattern.len();
    let rest = title_text[start..].strip_prefix(' ')?.trim();
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

pub struct ListingParser {
    base_url: url::Url,
    section: Selector,
    section_title: Selector,
    card: Selector,
    card_link: Selector,
    card_title: Selector,
    show_more: Selector,
}

impl ListingParser {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = url::Url::parse(base_url)
            .map_err(|e| ScrapeError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self {
            base_url,
            section: selector(SECTION_SELECTOR)?,
            section_title: selector(SECTION_TITLE_SELECTOR)?,
            card: selector(CARD_SELECTOR)?,
            card_link: selector(CARD_LINK_SELECTOR)?,
            card_title: selector(CARD_TITLE_SELECTOR)?,
            show_more: selector(SHOW_MORE_SELECTOR)?,
        })
    }

    /// Locate the first section whose heading contains the section's pattern
    /// and read its cards. `None` when the page has no such section.
    pub fn parse_section(&self, html: &str, section: Section) -> Option<SectionListing> {
        let document = Html::parse_document(html);
        let pattern = section.heading_pattern();

        for (i, block) in document.select(&self.section).enumerate() {
            let Some(title) = block.select(&self.section_title).next() else {
                debug!("Section {} has no heading", i + 1);
                continue;
            };
            let title_text = collapse_text(&title);
            if !title_text.contains(pattern) {
                continue;
            }
            let Some(heading) = extract_category(&title_text, pattern) else {
                continue;
            };

            debug!("Found section '{}'", title_text);
            let items = block
                .select(&self.card)
                .filter_map(|card| self.parse_card(&card))
                .collect();

            return Some(SectionListing {
                heading,
                items,
                has_show_more: block.select(&self.show_more).next().is_some(),
            });
        }

        None
    }

    fn parse_card(&self, card: &ElementRef) -> Option<ListingItem> {
        let href = card
            .select(&self.card_link)
            .next()
            .and_then(|el| el.value().attr("href"))?;
        let title = card.select(&self.card_title).next().map(|el| collapse_text(&el))?;

        let url = if href.starts_with("http") {
            href.to_string()
        } else {
            self.base_url.join(href).map(String::from).unwrap_or_else(|_| href.to_string())
        };

        Some(ListingItem { title, url })
    }
}

fn collapse_text(element: &ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title length and URL checks applied to every scraped card.
#[derive(Debug, Clone)]
pub struct ItemValidator {
    min_title_len: usize,
    max_title_len: usize,
    required_url_part: String,
}

impl ItemValidator {
    pub fn from_config(config: &ScrapingConfig) -> Self {
        Self {
            min_title_len: config.min_title_len,
            max_title_len: config.max_title_len,
            required_url_part: config.required_url_part.clone(),
        }
    }

    pub fn is_valid(&self, item: &ListingItem) -> bool {
        let len = item.title.chars().count();
        if len < self.min_title_len || len > self.max_title_len {
            debug!("Rejected title with length {}: {}", len, item.title);
            return false;
        }
        if item.url.is_empty() || !item.url.contains(&self.required_url_part) {
            debug!("Rejected URL: {}", item.url);
            return false;
        }
        true
    }
}
