//! Run reports and console summaries.

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use slidegrab_pool::{BatchReport, BatchSummary, TaskResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SCRAPE_INFO: &str = "scrape_info.json";
pub const DOWNLOAD_INFO: &str = "download_info.json";
pub const RETRY_INFO: &str = "retry_info.json";

#[derive(Debug, Serialize)]
struct SystemInfo {
    version: &'static str,
    os: &'static str,
    arch: &'static str,
    browser: &'static str,
}

impl SystemInfo {
    fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            browser: "Chromium",
        }
    }
}

#[derive(Debug, Serialize)]
struct RunInfo<'a, Q, P> {
    timestamp: String,
    batch_id: String,
    parameters: &'a Q,
    summary: &'a BatchSummary,
    results: Vec<&'a TaskResult<P>>,
    system_info: SystemInfo,
}

/// Write `file_name` into `dir` describing one batch. Results are sorted by
/// task id.
pub fn write_run_info<Q, P>(dir: &Path, file_name: &str, parameters: &Q, report: &BatchReport<P>) -> Result<PathBuf>
where
    Q: Serialize,
    P: Serialize,
{
    let info = RunInfo {
        timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        batch_id: report.batch_id.to_string(),
        parameters,
        summary: &report.summary,
        results: report.sorted_results(),
        system_info: SystemInfo::current(),
    };

    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(file_name);
    let json = serde_json::to_string_pretty(&info)?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    info!("Run info saved to {}", path.display());
    Ok(path)
}

fn elapsed_line(summary: &BatchSummary) -> String {
    format!(
        "Elapsed:   {:.1}s ({:.0}% success)",
        summary.elapsed_secs,
        summary.success_rate()
    )
}

/// Print a batch summary and its failures.
pub fn print_summary<P>(title: &str, report: &BatchReport<P>, describe: impl Fn(&P) -> String) {
    let summary = &report.summary;
    println!();
    println!("{title}");
    println!("{}", "=".repeat(title.len().max(40)));
    if let Some(error) = &summary.error {
        println!("Batch error: {error}");
        return;
    }
    println!("Succeeded: {}/{}", summary.succeeded, summary.total);
    println!("Failed:    {}/{}", summary.failed, summary.total);
    for (key, value) in summary.metrics.iter() {
        println!("{key}: {value}");
    }
    println!("{}", elapsed_line(summary));

    if !report.failures.is_empty() {
        println!();
        println!("Failed tasks:");
        for failure in &report.failures {
            println!(
                "  [{}] {}: {}",
                failure.task_id,
                describe(&failure.payload),
                failure.error_message().unwrap_or_default()
            );
        }
    }
}
