//! The "scrape listing" domain action.

use crate::collector::ItemCollector;
use crate::error::{Result, ScrapeError};
use crate::output::write_listing_csv;
use crate::parser::{ItemValidator, ListingParser, SectionListing, SHOW_MORE_SELECTOR};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slidegrab_browser::BrowserActions;
use slidegrab_core::{Category, ScrapingConfig, Section};
use slidegrab_pool::{DomainAction, Metrics, WorkOutcome};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pause after a failed scrape round
const ERROR_PAUSE: Duration = Duration::from_secs(2);

/// One category/section scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingJob {
    pub category: Category,
    pub section: Section,
    pub download_num: usize,
    pub output_dir: PathBuf,
}

impl ListingJob {
    /// `category/section`, used in logs and reports
    pub fn label(&self) -> String {
        format!("{}/{}", self.category, self.section)
    }
}

/// Scrapes one section of a category page into a CSV file.
pub struct ListingAction {
    config: ScrapingConfig,
    parser: ListingParser,
    element_wait: Duration,
    error_pause: Duration,
}

impl ListingAction {
    pub fn new(config: ScrapingConfig, element_wait: Duration) -> Result<Self> {
        let parser = ListingParser::new(&config.base_url)?;
        Ok(Self {
            config,
            parser,
            element_wait,
            error_pause: ERROR_PAUSE,
        })
    }

    /// Override the pause after a failed round.
    #[must_use]
    pub fn with_error_pause(mut self, pause: Duration) -> Self {
        self.error_pause = pause;
        self
    }

    async fn read_section<S: BrowserActions + ?Sized>(&self, page: &S, section: Section) -> Result<Option<SectionListing>> {
        let html = page.content().await?;
        Ok(self.parser.parse_section(&html, section))
    }

    /// Click the section's "Show More" button in page context. `false` when
    /// the button is absent, hidden or disabled.
    async fn click_show_more<S: BrowserActions + ?Sized>(&self, page: &S, section: Section) -> Result<bool> {
        let script = show_more_script(section);
        let clicked = page.evaluate_bool(&script).await?;
        if clicked {
            debug!("Clicked Show More");
            sleep_ms(self.config.show_more_delay_ms).await;
        }
        Ok(clicked)
    }

    pub async fn scrape<S: BrowserActions + ?Sized>(&self, job: &ListingJob, page: &S) -> Result<WorkOutcome> {
        let url = job.category.url(&self.config.base_url);
        info!("Scraping {} from {}", job.label(), url);

        page.navigate(&url).await?;
        let wait_ms = u64::try_from(self.element_wait.as_millis()).unwrap_or(u64::MAX);
        page.wait_for_selector("section", wait_ms).await?;
        sleep_ms(self.config.page_settle_ms).await;

        let Some(first) = self.read_section(page, job.section).await? else {
            warn!("No '{}' section on {}", job.section.heading_pattern(), url);
            return Ok(WorkOutcome::unsuccessful(
                format!("section not found: {}", job.section.heading_pattern()),
                Metrics::new().with("items", 0).with("files", 0),
            ));
        };

        let heading = first.heading.clone();
        let mut collector = ItemCollector::new(job.download_num, ItemValidator::from_config(&self.config));
        let mut pending = Some(first);
        let mut consecutive_errors = 0;
        let mut stale_rounds = 0;

        while !collector.is_full() {
            let round = match pending.take() {
                Some(listing) => Ok(listing),
                None => self.read_section(page, job.section).await.and_then(|listing| {
                    listing.ok_or_else(|| ScrapeError::Selector("section disappeared from page".to_string()))
                }),
            };

            let step = match round {
                Ok(listing) => {
                    let has_show_more = listing.has_show_more;
                    let added = collector.absorb(listing.items);
                    info!("{}: {} item(s) collected ({} new)", job.label(), collector.len(), added);
                    if collector.is_full() {
                        break;
                    }
                    if has_show_more {
                        self.click_show_more(page, job.section).await.map(|clicked| (added, clicked))
                    } else {
                        Ok((added, false))
                    }
                }
                Err(e) => Err(e),
            };

            match step {
                Ok((added, clicked)) => {
                    consecutive_errors = 0;
                    if added == 0 {
                        if !clicked {
                            info!("{}: no more items to load", job.label());
                            break;
                        }
                        stale_rounds += 1;
                        if stale_rounds >= self.config.max_consecutive_errors {
                            info!("{}: Show More stopped producing items", job.label());
                            break;
                        }
                    } else {
                        stale_rounds = 0;
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(
                        "{}: round failed ({}/{}): {}",
                        job.label(),
                        consecutive_errors,
                        self.config.max_consecutive_errors,
                        e
                    );
                    if consecutive_errors >= self.config.max_consecutive_errors {
                        warn!("{}: too many consecutive errors, stopping", job.label());
                        break;
                    }
                    tokio::time::sleep(self.error_pause).await;
                }
            }
        }

        if collector.rejected() > 0 {
            debug!("{}: {} card(s) failed validation", job.label(), collector.rejected());
        }

        let rows = collector.finalize();
        if rows.is_empty() {
            return Ok(WorkOutcome::unsuccessful(
                "no valid items found",
                Metrics::new().with("items", 0).with("files", 0),
            ));
        }

        write_listing_csv(&job.output_dir, &heading, job.section, &rows)?;
        let items = u64::try_from(rows.len()).unwrap_or(u64::MAX);
        info!("{}: saved {} item(s)", job.label(), items);
        Ok(WorkOutcome::success(Metrics::new().with("items", items).with("files", 1)))
    }
}

#[async_trait]
impl<S> DomainAction<S> for ListingAction
where
    S: BrowserActions + 'static,
{
    type Payload = ListingJob;
    type Error = ScrapeError;

    async fn perform(&self, job: &ListingJob, session: &mut S) -> Result<WorkOutcome> {
        self.scrape(job, &*session).await
    }
}

async fn sleep_ms(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Script clicking the "Show More" button inside the section whose heading
/// contains the section's pattern.
pub fn show_more_script(section: Section) -> String {
    format!(
        r"(() => {{
    for (const block of document.querySelectorAll('section')) {{
        const heading = block.querySelector('h2');
        if (!heading || !heading.textContent.includes('{pattern}')) continue;
        const button = block.querySelector('{button}');
        if (!button || button.disabled || button.offsetParent === null) return false;
        button.scrollIntoView({{ block: 'center' }});
        button.click();
        return true;
    }}
    return false;
}})()",
        pattern = section.heading_pattern(),
        button = SHOW_MORE_SELECTOR,
    )
}
