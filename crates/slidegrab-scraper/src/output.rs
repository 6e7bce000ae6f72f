use crate::collector::ListingRow;
use crate::error::Result;
use slidegrab_core::naming::listing_file_name;
use slidegrab_core::Section;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Write `rows` to `{heading}_{Section}.csv` under `output_dir` with header
/// `index,title,url`. Returns the file path.
pub fn write_listing_csv(
    output_dir: &Path,
    heading: &str,
    section: Section,
    rows: &[ListingRow],
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(listing_file_name(heading, section));

    let mut writer = csv::Writer::from_path(&path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!("Saved {} row(s) to {}", rows.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_listing_csv() {
        let dir = TempDir::new().unwrap();
        let rows = vec![
            ListingRow {
                index: 1,
                title: "Deck, with comma".to_string(),
                url: "https://www.slideshare.net/a/one".to_string(),
            },
            ListingRow {
                index: 2,
                title: "Deck Two".to_string(),
                url: "https://www.slideshare.net/a/two".to_string(),
            },
        ];

        let path = write_listing_csv(&dir.path().join("run"), "Business", Section::New, &rows).unwrap();

        assert_eq!(path.file_name().unwrap(), "Business_New.csv");
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "index,title,url");
        assert_eq!(lines[1], "1,\"Deck, with comma\",https://www.slideshare.net/a/one");
        assert_eq!(lines.len(), 3);
    }
}
