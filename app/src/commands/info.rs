//! Informational subcommands and config bootstrap.

use anyhow::{bail, Result};
use slidegrab_core::{AppConfig, Section, SUPPORTED_CATEGORIES};

pub fn list_categories() {
    println!("Supported categories ({}):", SUPPORTED_CATEGORIES.len());
    for (i, slug) in SUPPORTED_CATEGORIES.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, slug);
    }
    println!("\nUse `all` to scrape every category.");
}

pub fn list_sections() {
    println!("Sections:");
    for section in Section::ALL {
        println!("  {:<9} \"{} ...\"", section.as_str(), section.heading_pattern());
    }
    println!("\nUse `all` to scrape every section.");
}

pub fn init_config(force: bool) -> Result<()> {
    let path = AppConfig::config_path()?;
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    AppConfig::default().save()?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
