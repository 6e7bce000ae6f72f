//! `slidegrab urls`: category listings to CSV files.

use super::{batch_runner, cancel_on_ctrl_c, retry_policy, should_retry, warm_up_if_parallel};
use crate::cli::UrlsArgs;
use crate::report::{print_summary, write_run_info, RETRY_INFO, SCRAPE_INFO};
use anyhow::{bail, Context, Result};
use chrono::Local;
use serde::Serialize;
use slidegrab_browser::BrowserSessionFactory;
use slidegrab_core::naming::run_dir_name;
use slidegrab_core::{AppConfig, Category, Section};
use slidegrab_pool::{TaskDescriptor, WorkerUnit};
use slidegrab_scraper::{ListingAction, ListingJob};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Serialize)]
struct UrlsParameters<'a> {
    category: &'a str,
    section: &'a str,
    num: usize,
    window_num: usize,
    headless: bool,
    output_dir: &'a Path,
}

fn build_tasks(
    categories: &[Category],
    sections: &[Section],
    num: usize,
    output_dir: &Path,
    max_retries: u32,
    headless: bool,
) -> Vec<TaskDescriptor<ListingJob>> {
    categories
        .iter()
        .flat_map(|category| sections.iter().map(move |section| (category, *section)))
        .enumerate()
        .map(|(i, (category, section))| {
            let job = ListingJob {
                category: category.clone(),
                section,
                download_num: num,
                output_dir: output_dir.to_path_buf(),
            };
            TaskDescriptor::new(i + 1, job, max_retries, headless)
        })
        .collect()
}

pub async fn run(config: &AppConfig, args: UrlsArgs) -> Result<()> {
    let categories = Category::parse_selection(&args.category)?;
    let sections = Section::parse_selection(&args.section)?;
    let num = args.num.unwrap_or(config.scraping.download_num);
    if num == 0 {
        bail!("--num must be at least 1");
    }
    let parallel = args.parallel.unwrap_or(config.pool.concurrency);
    let headless = args.headless || config.browser.headless;

    let task_count = categories.len() * sections.len();
    let window = (task_count > 1).then_some(parallel);
    let root = args.output_dir.clone().unwrap_or_else(|| config.output.url_dir.clone());
    let run_dir = root.join(run_dir_name(
        &Local::now(),
        &args.category,
        &args.section,
        num,
        window,
        headless,
    ));
    std::fs::create_dir_all(&run_dir).with_context(|| format!("creating {}", run_dir.display()))?;

    info!("Scraping {} section(s), {} item(s) each, into {}", task_count, num, run_dir.display());
    let tasks = build_tasks(&categories, &sections, num, &run_dir, config.pool.max_retries, headless);

    let factory = Arc::new(BrowserSessionFactory::new(config.browser.clone()));
    let action = ListingAction::new(
        config.scraping.clone(),
        Duration::from_secs(config.browser.element_wait_secs),
    )?;
    let worker = Arc::new(WorkerUnit::new(Arc::clone(&factory), Arc::new(action)));

    warm_up_if_parallel(&factory, parallel, tasks.len()).await;

    let cancel = cancel_on_ctrl_c();
    let runner = batch_runner(config, cancel.clone());
    let report = runner.run_batch(Arc::clone(&worker), tasks, parallel).await;

    print_summary("Listing scrape summary", &report, ListingJob::label);
    if let Some(error) = &report.summary.error {
        bail!("batch failed: {error}");
    }

    let parameters = UrlsParameters {
        category: &args.category,
        section: &args.section,
        num,
        window_num: parallel,
        headless,
        output_dir: &run_dir,
    };
    write_run_info(&run_dir, SCRAPE_INFO, &parameters, &report)?;

    if should_retry(args.retry.decision(), report.failures.len(), &cancel).await {
        let retry = runner
            .retry_batch(worker, &report.failures, &retry_policy(config, headless))
            .await;
        print_summary("Retry summary", &retry, ListingJob::label);
        write_run_info(&run_dir, RETRY_INFO, &parameters, &retry)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_tasks_cross_product() {
        let categories = vec![Category::new("business").unwrap(), Category::new("technology").unwrap()];
        let tasks = build_tasks(&categories, &Section::ALL, 5, Path::new("out"), 2, true);

        assert_eq!(tasks.len(), 6);
        assert_eq!(tasks[0].task_id.as_str(), "1");
        assert_eq!(tasks[5].task_id.as_str(), "6");
        assert_eq!(tasks[3].payload.category.as_str(), "technology");
        assert_eq!(tasks[3].payload.section, Section::Featured);
        assert!(tasks.iter().all(|t| t.max_retries == 2 && t.headless));
    }
}
