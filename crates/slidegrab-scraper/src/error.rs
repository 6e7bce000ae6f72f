use slidegrab_browser::BrowserError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Invalid selector {0}")]
    Selector(String),

    #[error("Invalid URL {0}")]
    InvalidUrl(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
