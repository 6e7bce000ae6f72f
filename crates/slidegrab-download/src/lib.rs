//! Slidegrab Download - presentation slides to images on disk.
//!
//! For each presentation URL the [`SlideAction`] opens the page, finds the
//! slide images, picks the highest-resolution candidate of each and stores
//! it as `{index:03}_{title}/{title}_{n:03}.jpg`. The [`source`] module turns
//! listing CSV files and run directories into [`SlideJob`]s.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod action;
pub mod convert;
pub mod error;
pub mod fetch;
pub mod page;
pub mod source;

// Re-export commonly used types
pub use action::{SlideAction, SlideJob};
pub use convert::{convert_to_jpeg, existing_slide, save_slide};
pub use error::{DownloadError, Result};
pub use fetch::{fetch_with_retries, FetchedImage, HttpImageSource, ImageSource};
pub use page::{best_srcset_candidate, extract_slide_images, extract_title, SlideImage};
pub use source::{discover_csv_files, latest_run_dir, list_run_dirs, load_jobs_from_csv, run_dir};
