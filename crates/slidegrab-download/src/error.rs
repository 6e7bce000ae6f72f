use slidegrab_browser::BrowserError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No source found: {0}")]
    NoSource(String),
}

pub type Result<T> = std::result::Result<T, DownloadError>;
