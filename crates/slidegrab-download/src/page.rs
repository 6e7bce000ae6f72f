//! Presentation page parsing: title and slide image URLs.

use scraper::{Html, Selector};
use tracing::debug;

/// Slide images rendered in the vertical viewer
pub const SLIDE_IMAGE_SELECTOR: &str = ".vertical-slide-image";

/// Title candidates, most specific first
pub const TITLE_SELECTORS: [&str; 5] = [
    r#"h1[data-cy="presentation-title"]"#,
    "h1.slideshow-title",
    "h1",
    ".presentation-title",
    r#"[data-testid="presentation-title"]"#,
];

/// One slide found on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideImage {
    /// 1-based position on the page
    pub number: usize,
    pub url: String,
}

/// Largest-width candidate of a `srcset` attribute.
///
/// Only width descriptors (`1024w`) are considered; `None` when there are
/// none.
pub fn best_srcset_candidate(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .filter_map(|candidate| {
            let mut parts = candidate.split_whitespace();
            let url = parts.next()?;
            let width = parts.next()?.strip_suffix('w')?.parse::<u32>().ok()?;
            Some((url, width))
        })
        .max_by_key(|(_, width)| *width)
        .map(|(url, _)| url.to_string())
}

/// First non-empty title among [`TITLE_SELECTORS`].
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    TITLE_SELECTORS.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        document.select(&selector).find_map(|el| {
            let text = el.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            (!text.is_empty()).then_some(text)
        })
    })
}

/// Best-quality URL of every slide image, in page order.
///
/// Slides without a usable URL keep their position so numbering matches
/// the viewer.
pub fn extract_slide_images(html: &str) -> Vec<SlideImage> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(SLIDE_IMAGE_SELECTOR) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .enumerate()
        .filter_map(|(i, img)| {
            let element = img.value();
            let url = element
                .attr("srcset")
                .and_then(best_srcset_candidate)
                .or_else(|| element.attr("src").map(str::to_string))
                .filter(|url| !url.trim().is_empty());
            if url.is_none() {
                debug!("Slide {} has no image URL", i + 1);
            }
            url.map(|url| SlideImage { number: i + 1, url })
        })
        .collect()
}
