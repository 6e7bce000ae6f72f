//! Canonical names for everything slidegrab writes to disk.
//!
//! Every code path (single task or parallel batch) goes through these
//! helpers, so a presentation always lands in `{index:03}_{title}/` and
//! a slide always in `{title}_{n:03}.jpg`.

use chrono::{DateTime, TimeZone};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::types::Section;

/// Maximum length of a sanitized file name component, in characters.
pub const MAX_COMPONENT_LEN: usize = 40;

/// Characters kept from the title in a slide file name.
const SLIDE_BASE_LEN: usize = 30;

/// Presentation directories longer than this are shortened.
const MAX_DIR_PATH_LEN: usize = 200;

/// Slide paths longer than this fall back to `slide_{n:03}.jpg`.
const MAX_FILE_PATH_LEN: usize = 250;

/// Fallback name for titles that sanitize to nothing.
pub const UNKNOWN: &str = "unknown";

/// Replace characters that are invalid in file names, collapse whitespace,
/// trim separators and cap the length at a word boundary.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();
    static EDGES: OnceLock<Regex> = OnceLock::new();

    let invalid = INVALID.get_or_init(|| Regex::new(r#"[<>:"/\\|?*'`]"#).expect("valid regex"));
    let spaces = SPACES.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    let edges =
        EDGES.get_or_init(|| Regex::new(r"^[._\-\s]+|[._\-\s]+$").expect("valid regex"));

    let cleaned = invalid.replace_all(name, "_");
    let cleaned = spaces.replace_all(&cleaned, " ");
    let cleaned = edges.replace_all(cleaned.trim(), "").into_owned();

    let truncated = if cleaned.chars().count() > MAX_COMPONENT_LEN {
        truncate_at_word(&cleaned, MAX_COMPONENT_LEN)
    } else {
        cleaned
    };

    if truncated.is_empty() {
        UNKNOWN.to_string()
    } else {
        truncated
    }
}

/// Keep whole words while they fit in `max` characters; hard-cut when even
/// the first word is too long.
fn truncate_at_word(text: &str, max: usize) -> String {
    let mut out = String::new();
    for word in text.split(' ') {
        let candidate_len = if out.is_empty() {
            word.chars().count()
        } else {
            out.chars().count() + 1 + word.chars().count()
        };
        if candidate_len > max {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }

    if out.is_empty() {
        text.chars().take(max).collect()
    } else {
        out
    }
}

/// Derive a readable title from a presentation URL (`/{user}/{title-slug}`).
#[must_use]
pub fn title_from_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let parts: Vec<&str> = parsed
            .path()
            .trim_matches('/')
            .split('/')
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() >= 2 {
            if let Some(slug) = parts.last() {
                return sanitize_filename(&title_case(&slug.replace('-', " ")));
            }
        }
    }

    let tail = url.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    if tail.is_empty() {
        sanitize_filename("unknown_presentation")
    } else {
        sanitize_filename(tail)
    }
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Directory name for the presentation at `index` (1-based CSV row).
#[must_use]
pub fn presentation_dir_name(index: usize, title: &str) -> String {
    format!("{index:03}_{}", sanitize_filename(title))
}

/// Full presentation directory under `output_dir`, shortened when the path
/// would get too long for common filesystems.
#[must_use]
pub fn presentation_dir(output_dir: &Path, index: usize, title: &str) -> PathBuf {
    let full = output_dir.join(presentation_dir_name(index, title));
    if full.as_os_str().len() <= MAX_DIR_PATH_LEN {
        return full;
    }

    let short: String = sanitize_filename(title).chars().take(20).collect();
    let short_name = format!("{index:03}_{short}_{:04}", title_suffix(title));
    tracing::warn!(
        "Path too long, shortening directory {} -> {}",
        full.display(),
        short_name
    );
    output_dir.join(short_name)
}

/// Path of slide number `slide` (1-based) inside `presentation_dir`.
#[must_use]
pub fn slide_path(presentation_dir: &Path, title: &str, slide: usize) -> PathBuf {
    let base: String = sanitize_filename(title).chars().take(SLIDE_BASE_LEN).collect();
    let path = presentation_dir.join(format!("{base}_{slide:03}.jpg"));
    if path.as_os_str().len() > MAX_FILE_PATH_LEN {
        presentation_dir.join(format!("slide_{slide:03}.jpg"))
    } else {
        path
    }
}

/// Name of the CSV written for one listing section.
#[must_use]
pub fn listing_file_name(category_heading: &str, section: Section) -> String {
    format!(
        "{}_{}.csv",
        sanitize_filename(category_heading),
        section.display_name()
    )
}

/// Name of a listing run directory.
///
/// `{YYYY-MM-DD}_{HH-MM-SS}_category={c}_section={s}_num={n}[_window={w}][_headless]`
#[must_use]
pub fn run_dir_name<Tz>(
    now: &DateTime<Tz>,
    category: &str,
    section: &str,
    num: usize,
    window: Option<usize>,
    headless: bool,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut name = format!(
        "{}_category={category}_section={section}_num={num}",
        now.format("%Y-%m-%d_%H-%M-%S")
    );
    if let Some(window) = window.filter(|w| *w > 1) {
        name.push_str(&format!("_window={window}"));
    }
    if headless {
        name.push_str("_headless");
    }
    name
}

/// Four-digit suffix derived from the SHA-256 of `title`.
fn title_suffix(title: &str) -> u32 {
    let digest = Sha256::digest(title.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) % 10_000
}
