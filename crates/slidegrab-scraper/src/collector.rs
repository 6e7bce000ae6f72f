//! Accumulates validated, de-duplicated items across "Show More" rounds.

use crate::parser::{ItemValidator, ListingItem};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A finalized CSV row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRow {
    pub index: usize,
    pub title: String,
    pub url: String,
}

pub struct ItemCollector {
    limit: usize,
    validator: ItemValidator,
    items: Vec<ListingItem>,
    seen: HashSet<(String, String)>,
    rejected: usize,
}

impl ItemCollector {
    pub fn new(limit: usize, validator: ItemValidator) -> Self {
        Self {
            limit,
            validator,
            items: Vec::new(),
            seen: HashSet::new(),
            rejected: 0,
        }
    }

    /// Add the items not seen before, up to the limit. Returns how many
    /// were added.
    pub fn absorb(&mut self, items: impl IntoIterator<Item = ListingItem>) -> usize {
        let mut added = 0;
        for item in items {
            if self.is_full() {
                break;
            }
            if !self.validator.is_valid(&item) {
                self.rejected += 1;
                continue;
            }
            if self.seen.insert((item.title.clone(), item.url.clone())) {
                self.items.push(item);
                added += 1;
            }
        }
        added
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.limit
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Cards dropped by validation so far, repeats included.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Renumber from 1, trim whitespace and give scheme-less URLs `https://`.
    pub fn finalize(self) -> Vec<ListingRow> {
        self.items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let url = item.url.trim();
                let url = if url.starts_with("http://") || url.starts_with("https://") {
                    url.to_string()
                } else {
                    format!("https://{url}")
                };
                ListingRow {
                    index: i + 1,
                    title: item.title.trim().to_string(),
                    url,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidegrab_core::ScrapingConfig;

    fn item(title: &str, url: &str) -> ListingItem {
        ListingItem {
            title: title.to_string(),
            url: url.to_string(),
        }
    }

    fn collector(limit: usize) -> ItemCollector {
        ItemCollector::new(limit, ItemValidator::from_config(&ScrapingConfig::default()))
    }

    #[test]
    fn test_deduplicates_on_title_and_url() {
        let mut collector = collector(10);
        let first = collector.absorb(vec![
            item("Deck One", "https://www.slideshare.net/a/one"),
            item("Deck Two", "https://www.slideshare.net/a/two"),
        ]);
        let second = collector.absorb(vec![
            item("Deck One", "https://www.slideshare.net/a/one"),
            item("Deck One", "https://www.slideshare.net/a/one-again"),
        ]);

        assert_eq!(first, 2);
        assert_eq!(second, 1);
        assert_eq!(collector.len(), 3);
    }

    #[test]
    fn test_stops_at_limit() {
        let mut collector = collector(2);
        let added = collector.absorb((1..=5).map(|i| item(&format!("Deck {i:02}"), &format!("https://www.slideshare.net/a/{i}"))));
        assert_eq!(added, 2);
        assert!(collector.is_full());
    }

    #[test]
    fn test_rejects_invalid_items() {
        let mut collector = collector(5);
        collector.absorb(vec![item("Tiny", "https://www.slideshare.net/a/b"), item("Valid Deck", "https://other.site/x")]);
        assert!(collector.is_empty());
        assert_eq!(collector.rejected(), 2);
    }

    #[test]
    fn test_finalize_renumbers_and_normalizes() {
        let mut collector = ItemCollector::new(
            5,
            ItemValidator::from_config(&ScrapingConfig {
                required_url_part: "slideshare.net".to_string(),
                ..ScrapingConfig::default()
            }),
        );
        collector.absorb(vec![
            item(" Deck One ", "www.slideshare.net/a/one"),
            item("Deck Two", " https://www.slideshare.net/a/two "),
        ]);

        let rows = collector.finalize();
        assert_eq!(rows[0], ListingRow {
            index: 1,
            title: "Deck One".to_string(),
            url: "https://www.slideshare.net/a/one".to_string(),
        });
        assert_eq!(rows[1].index, 2);
        assert_eq!(rows[1].url, "https://www.slideshare.net/a/two");
    }
}
