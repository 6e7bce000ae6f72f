//! Command-line interface.

use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "slidegrab", version, about = "Collect presentation listings and download their slides")]
pub struct Cli {
    /// Configuration file (defaults to the per-user config path)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape category listings into CSV files of presentation URLs
    Urls(UrlsArgs),
    /// Download the slides of presentations listed in CSV files
    Slides(SlidesArgs),
    /// Print the supported categories
    ListCategories,
    /// Print the listing sections
    ListSections,
    /// Write a default configuration file to the per-user config path
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Whether to resubmit failed tasks without asking.
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryArgs {
    /// Retry failed tasks without prompting
    #[arg(long, conflicts_with = "no_retry")]
    pub retry_failed: bool,

    /// Never retry failed tasks
    #[arg(long)]
    pub no_retry: bool,
}

impl RetryArgs {
    /// `None` means ask the operator.
    pub fn decision(&self) -> Option<bool> {
        match (self.retry_failed, self.no_retry) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Args, Debug)]
pub struct UrlsArgs {
    /// Category slug, or `all`
    #[arg(short, long, default_value = "business")]
    pub category: String,

    /// featured, popular, new, or `all`
    #[arg(short, long, default_value = "featured")]
    pub section: String,

    /// Presentations to collect per section
    #[arg(short, long)]
    pub num: Option<usize>,

    /// Browsers running at once
    #[arg(short, long)]
    pub parallel: Option<usize>,

    #[arg(long)]
    pub headless: bool,

    /// Root directory for run folders
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub retry: RetryArgs,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["csv_file", "folder", "from_latest"])))]
pub struct SlidesArgs {
    /// A single listing CSV
    #[arg(long, value_name = "FILE")]
    pub csv_file: Option<PathBuf>,

    /// Run folder name under the URL directory
    #[arg(long, value_name = "NAME")]
    pub folder: Option<String>,

    /// Use the most recent run folder
    #[arg(long)]
    pub from_latest: bool,

    /// Only CSV files whose name contains this category
    #[arg(short, long, conflicts_with = "csv_file")]
    pub category: Option<String>,

    /// Only CSV files whose name contains this section
    #[arg(short, long, conflicts_with = "csv_file")]
    pub section: Option<String>,

    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Presentations downloaded at once
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Seconds between slide downloads
    #[arg(short, long)]
    pub delay: Option<f64>,

    /// Attempts per slide image
    #[arg(short = 'r', long)]
    pub max_retries: Option<u32>,

    #[arg(long)]
    pub headless: bool,

    #[command(flatten)]
    pub retry: RetryArgs,
}
