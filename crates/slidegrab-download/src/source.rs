//! Where slide jobs come from: listing CSV files and run directories.

use crate::action::SlideJob;
use crate::error::{DownloadError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Read a listing CSV (`index,title,url`) into slide jobs rooted at
/// `output_dir`.
///
/// Columns are read by position; the job index is the 1-based row number.
/// Rows with an empty URL are skipped.
pub fn load_jobs_from_csv(path: &Path, output_dir: &Path) -> Result<Vec<SlideJob>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut jobs = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let index = row + 1;
        let title = record.get(1).map(str::trim).unwrap_or_default();
        let url = record.get(2).map(str::trim).unwrap_or_default();

        if url.is_empty() {
            warn!("{}: row {} has no URL, skipping", path.display(), index);
            continue;
        }

        jobs.push(SlideJob {
            index,
            url: url.to_string(),
            title: title.to_string(),
            output_dir: output_dir.to_path_buf(),
        });
    }

    debug!("Loaded {} job(s) from {}", jobs.len(), path.display());
    Ok(jobs)
}

/// CSV files in `dir` whose stem contains the given filters
/// (case-insensitive), sorted by path.
pub fn discover_csv_files(
    dir: &Path,
    category_filter: Option<&str>,
    section_filter: Option<&str>,
) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(DownloadError::NoSource(format!("{} is not a directory", dir.display())));
    }

    let matches = |stem: &str, filter: Option<&str>| {
        filter.map_or(true, |f| stem.contains(&f.to_lowercase()))
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv || !path.is_file() {
            continue;
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if matches(&stem, category_filter) && matches(&stem, section_filter) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Most recently modified subdirectory of `url_dir`.
pub fn latest_run_dir(url_dir: &Path) -> Result<PathBuf> {
    if !url_dir.is_dir() {
        return Err(DownloadError::NoSource(format!(
            "{} does not exist",
            url_dir.display()
        )));
    }

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(url_dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_dir() {
            continue;
        }
        let modified = metadata.modified()?;
        if latest.as_ref().map_or(true, |(best, _)| modified > *best) {
            latest = Some((modified, entry.path()));
        }
    }

    latest
        .map(|(_, path)| path)
        .ok_or_else(|| DownloadError::NoSource(format!("no run directories in {}", url_dir.display())))
}

/// Names of the run directories under `url_dir`, sorted. Empty when
/// `url_dir` does not exist.
pub fn list_run_dirs(url_dir: &Path) -> Result<Vec<String>> {
    if !url_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(url_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// The run directory `folder` under `url_dir`. The error lists the run
/// directories that do exist.
pub fn run_dir(url_dir: &Path, folder: &str) -> Result<PathBuf> {
    let dir = url_dir.join(folder);
    if dir.is_dir() {
        return Ok(dir);
    }

    let available = list_run_dirs(url_dir)?;
    let hint = if available.is_empty() {
        format!("no run folders in {}", url_dir.display())
    } else {
        format!("available: {}", available.join(", "))
    };
    Err(DownloadError::NoSource(format!(
        "run folder '{folder}' not found in {} ({hint})",
        url_dir.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_jobs_skips_rows_without_url() {
        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("Technology_Featured.csv");
        fs::write(
            &csv,
            "index,title,url\n\
             1,Cloud Basics,https://www.slideshare.net/a/cloud-basics\n\
             2,No Link,\n\
             3,Rust Intro,https://www.slideshare.net/b/rust-intro\n",
        )
        .unwrap();

        let jobs = load_jobs_from_csv(&csv, Path::new("out")).unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].index, 1);
        assert_eq!(jobs[0].title, "Cloud Basics");
        assert_eq!(jobs[1].index, 3);
        assert_eq!(jobs[1].url, "https://www.slideshare.net/b/rust-intro");
        assert_eq!(jobs[1].output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_load_jobs_tolerates_short_rows() {
        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("short.csv");
        fs::write(&csv, "index,title,url\n1,Only Title\n2,Deck,https://x.slideshare.net/u/deck\n").unwrap();

        let jobs = load_jobs_from_csv(&csv, dir.path()).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].index, 2);
    }

    #[test]
    fn test_discover_csv_files_filters() {
        let dir = TempDir::new().unwrap();
        for name in [
            "Technology_Featured.csv",
            "Technology_Popular.csv",
            "Business_Featured.csv",
            "notes.txt",
        ] {
            fs::write(dir.path().join(name), "index,title,url\n").unwrap();
        }

        let all = discover_csv_files(dir.path(), None, None).unwrap();
        assert_eq!(all.len(), 3);

        let tech = discover_csv_files(dir.path(), Some("TECHNOLOGY"), None).unwrap();
        assert_eq!(tech.len(), 2);

        let featured = discover_csv_files(dir.path(), Some("technology"), Some("featured")).unwrap();
        assert_eq!(featured, vec![dir.path().join("Technology_Featured.csv")]);
    }

    #[test]
    fn test_discover_missing_dir() {
        let dir = TempDir::new().unwrap();
        let result = discover_csv_files(&dir.path().join("missing"), None, None);
        assert!(matches!(result, Err(DownloadError::NoSource(_))));
    }

    #[test]
    fn test_latest_run_dir() {
        let dir = TempDir::new().unwrap();
        let older = dir.path().join("2024-01-01_10-00-00_category=all");
        let newer = dir.path().join("2024-01-02_10-00-00_category=all");
        fs::create_dir(&older).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));
        fs::create_dir(&newer).unwrap();
        fs::write(dir.path().join("stray.csv"), "").unwrap();

        assert_eq!(latest_run_dir(dir.path()).unwrap(), newer);
    }

    #[test]
    fn test_run_dir_lists_available_folders() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("2024-05-02_run")).unwrap();
        fs::create_dir(dir.path().join("2024-05-01_run")).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        assert_eq!(run_dir(dir.path(), "2024-05-01_run").unwrap(), dir.path().join("2024-05-01_run"));

        let err = run_dir(dir.path(), "2023-01-01_run").unwrap_err().to_string();
        assert!(err.contains("'2023-01-01_run' not found"));
        assert!(err.contains("available: 2024-05-01_run, 2024-05-02_run"));

        let missing = dir.path().join("nothing_here");
        let err = run_dir(&missing, "x").unwrap_err().to_string();
        assert!(err.contains("no run folders in"));
    }

    #[test]
    fn test_latest_run_dir_empty() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(latest_run_dir(dir.path()), Err(DownloadError::NoSource(_))));
    }
}
