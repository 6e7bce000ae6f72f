//! `slidegrab slides`: listing CSV files to slide images.

use super::{batch_runner, cancel_on_ctrl_c, retry_policy, should_retry, warm_up_if_parallel};
use crate::cli::SlidesArgs;
use crate::report::{print_summary, write_run_info, DOWNLOAD_INFO, RETRY_INFO};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use slidegrab_browser::BrowserSessionFactory;
use slidegrab_core::{AppConfig, DownloadConfig};
use slidegrab_download::{
    discover_csv_files, latest_run_dir, load_jobs_from_csv, run_dir, HttpImageSource, SlideAction,
    SlideJob,
};
use slidegrab_pool::{TaskDescriptor, WorkerUnit};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// CSV files to read and the directory their slides go under.
#[derive(Debug, PartialEq)]
struct Plan {
    csv_files: Vec<PathBuf>,
    output_root: PathBuf,
}

#[derive(Debug, Serialize)]
struct SlidesParameters<'a> {
    source: String,
    category: Option<&'a str>,
    section: Option<&'a str>,
    parallel: usize,
    delay_secs: f64,
    image_retries: u32,
    headless: bool,
    output_dir: &'a Path,
}

fn plan(config: &AppConfig, args: &SlidesArgs) -> Result<Plan> {
    let url_dir = &config.output.url_dir;
    let slides_dir = &config.output.slides_dir;

    if let Some(csv) = &args.csv_file {
        if !csv.is_file() {
            bail!("CSV file not found: {}", csv.display());
        }
        let run_name = csv
            .parent()
            .and_then(Path::file_name)
            .map(PathBuf::from)
            .unwrap_or_default();
        let output_root = args
            .output_dir
            .clone()
            .unwrap_or_else(|| slides_dir.join(run_name));
        return Ok(Plan {
            csv_files: vec![csv.clone()],
            output_root,
        });
    }

    let run_dir = match &args.folder {
        Some(folder) => run_dir(url_dir, folder)?,
        None => latest_run_dir(url_dir)?,
    };
    info!("Reading listings from {}", run_dir.display());

    let csv_files = discover_csv_files(&run_dir, args.category.as_deref(), args.section.as_deref())?;
    if csv_files.is_empty() {
        bail!("no matching CSV files in {}", run_dir.display());
    }

    let output_root = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => slides_dir.join(run_dir.file_name().map(PathBuf::from).unwrap_or_default()),
    };
    Ok(Plan {
        csv_files,
        output_root,
    })
}

/// One task per listed presentation, numbered across all CSV files. Each
/// CSV's presentations go to `{output_root}/{csv stem}`.
fn build_tasks(plan: &Plan, max_retries: u32, headless: bool) -> Result<Vec<TaskDescriptor<SlideJob>>> {
    let mut jobs = Vec::new();
    for csv in &plan.csv_files {
        let stem = csv.file_stem().map(PathBuf::from).unwrap_or_default();
        let loaded = load_jobs_from_csv(csv, &plan.output_root.join(stem))
            .with_context(|| format!("reading {}", csv.display()))?;
        if loaded.is_empty() {
            warn!("{} lists no presentations", csv.display());
        }
        jobs.extend(loaded);
    }

    Ok(jobs
        .into_iter()
        .enumerate()
        .map(|(i, job)| TaskDescriptor::new(i + 1, job, max_retries, headless))
        .collect())
}

fn download_config(config: &AppConfig, args: &SlidesArgs) -> Result<DownloadConfig> {
    let mut download = config.download.clone();
    if let Some(delay) = args.delay {
        let delay = Duration::try_from_secs_f64(delay).context("--delay must be a non-negative number of seconds")?;
        download.download_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    }
    if let Some(retries) = args.max_retries {
        download.image_retries = retries.max(1);
    }
    Ok(download)
}

fn describe(job: &SlideJob) -> String {
    format!("#{} {}", job.index, job.url)
}

pub async fn run(config: &AppConfig, args: SlidesArgs) -> Result<()> {
    let plan = plan(config, &args)?;
    let download = download_config(config, &args)?;
    let parallel = args.parallel.unwrap_or(download.workers);
    let headless = args.headless || config.browser.headless;

    let tasks = build_tasks(&plan, config.pool.max_retries, headless)?;
    if tasks.is_empty() {
        bail!("no presentations to download");
    }
    info!(
        "Downloading {} presentation(s) from {} CSV file(s) into {}",
        tasks.len(),
        plan.csv_files.len(),
        plan.output_root.display()
    );

    let factory = Arc::new(BrowserSessionFactory::new(config.browser.clone()));
    let source = Arc::new(HttpImageSource::new(&config.browser, &download)?);
    let action = SlideAction::new(
        download.clone(),
        source,
        Duration::from_secs(config.browser.element_wait_secs),
    );
    let worker = Arc::new(WorkerUnit::new(Arc::clone(&factory), Arc::new(action)));

    warm_up_if_parallel(&factory, parallel, tasks.len()).await;

    let cancel = cancel_on_ctrl_c();
    let runner = batch_runner(config, cancel.clone());
    let report = runner.run_batch(Arc::clone(&worker), tasks, parallel).await;

    print_summary("Slide download summary", &report, describe);
    if let Some(error) = &report.summary.error {
        bail!("batch failed: {error}");
    }

    let source_label = plan
        .csv_files
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let parameters = SlidesParameters {
        source: source_label,
        category: args.category.as_deref(),
        section: args.section.as_deref(),
        parallel,
        delay_secs: Duration::from_millis(download.download_delay_ms).as_secs_f64(),
        image_retries: download.image_retries,
        headless,
        output_dir: &plan.output_root,
    };
    write_run_info(&plan.output_root, DOWNLOAD_INFO, &parameters, &report)?;

    if should_retry(args.retry.decision(), report.failures.len(), &cancel).await {
        let retry = runner
            .retry_batch(worker, &report.failures, &retry_policy(config, headless))
            .await;
        print_summary("Retry summary", &retry, describe);
        write_run_info(&plan.output_root, RETRY_INFO, &parameters, &retry)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::RetryArgs;
    use std::fs;
    use tempfile::TempDir;

    fn args() -> SlidesArgs {
        SlidesArgs {
            csv_file: None,
            folder: None,
            from_latest: true,
            category: None,
            section: None,
            output_dir: None,
            parallel: None,
            delay: None,
            max_retries: None,
            headless: false,
            retry: RetryArgs::default(),
        }
    }

    fn config(root: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.output.url_dir = root.join("output_url");
        config.output.slides_dir = root.join("output");
        config
    }

    fn write_listing(dir: &Path, name: &str, rows: usize) {
        fs::create_dir_all(dir).unwrap();
        let mut body = String::from("index,title,url\n");
        for i in 1..=rows {
            body.push_str(&format!("{i},Deck {i},https://www.slideshare.net/u/deck-{i}\n"));
        }
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_plan_from_folder_with_filter() {
        let tmp = TempDir::new().unwrap();
        let config = config(tmp.path());
        let run = config.output.url_dir.join("2024-05-01_09-00-00_category=all_section=all_num=3");
        write_listing(&run, "Business_Featured.csv", 2);
        write_listing(&run, "Technology_Featured.csv", 3);

        let mut args = args();
        args.from_latest = false;
        args.folder = Some("2024-05-01_09-00-00_category=all_section=all_num=3".to_string());
        args.category = Some("technology".to_string());

        let plan = plan(&config, &args).unwrap();
        assert_eq!(plan.csv_files, vec![run.join("Technology_Featured.csv")]);
        assert_eq!(
            plan.output_root,
            config.output.slides_dir.join("2024-05-01_09-00-00_category=all_section=all_num=3")
        );

        let tasks = build_tasks(&plan, 2, false).unwrap();
        assert_eq!(tasks.len(), 3);
        assert_eq!(
            tasks[2].payload.output_dir,
            plan.output_root.join("Technology_Featured")
        );
    }

    #[test]
    fn test_tasks_numbered_across_files() {
        let tmp = TempDir::new().unwrap();
        let config = config(tmp.path());
        let run = config.output.url_dir.join("run");
        write_listing(&run, "A_Featured.csv", 2);
        write_listing(&run, "B_Featured.csv", 2);

        let plan = plan(&config, &args()).unwrap();
        let tasks = build_tasks(&plan, 1, true).unwrap();

        let ids: Vec<&str> = tasks.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3", "4"]);
        assert_eq!(tasks[2].payload.index, 1);
    }

    #[test]
    fn test_plan_missing_csv_file() {
        let tmp = TempDir::new().unwrap();
        let mut args = args();
        args.from_latest = false;
        args.csv_file = Some(tmp.path().join("nope.csv"));
        assert!(plan(&config(tmp.path()), &args).is_err());
    }

    #[test]
    fn test_plan_unknown_folder_lists_runs() {
        let tmp = TempDir::new().unwrap();
        let config = config(tmp.path());
        write_listing(&config.output.url_dir.join("2024-05-01_run"), "A_Featured.csv", 1);

        let mut args = args();
        args.from_latest = false;
        args.folder = Some("2024-06-01_run".to_string());

        let err = plan(&config, &args).unwrap_err().to_string();
        assert!(err.contains("available: 2024-05-01_run"), "{err}");
    }

    #[test]
    fn test_plan_without_runs_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(plan(&config(tmp.path()), &args()).is_err());
    }

    #[test]
    fn test_download_overrides() {
        let mut args = args();
        args.delay = Some(0.25);
        args.max_retries = Some(5);
        let download = download_config(&AppConfig::default(), &args).unwrap();
        assert_eq!(download.download_delay_ms, 250);
        assert_eq!(download.image_retries, 5);

        args.delay = Some(-1.0);
        assert!(download_config(&AppConfig::default(), &args).is_err());
    }
}
