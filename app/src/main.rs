//! slidegrab command-line application.
//!
//! This is the thin shell that parses arguments, sets up logging and loads
//! configuration. Scraping and downloading live in the `crates/` directory.

mod cli;
mod commands;
mod report;

use clap::Parser;
use cli::{Cli, Command};
use slidegrab_core::AppConfig;
use tracing::{debug, error, info};

/// Initialize tracing subscriber for logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose { "debug" } else { "info,slidegrab=debug" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::ListCategories => {
            commands::info::list_categories();
            Ok(())
        }
        Command::ListSections => {
            commands::info::list_sections();
            Ok(())
        }
        Command::InitConfig { force } => commands::info::init_config(force),
        Command::Urls(args) => {
            let config = AppConfig::resolve(cli.config.as_deref())?;
            debug!("Configuration: {:?}", config);
            commands::urls::run(&config, args).await
        }
        Command::Slides(args) => {
            let config = AppConfig::resolve(cli.config.as_deref())?;
            debug!("Configuration: {:?}", config);
            commands::slides::run(&config, args).await
        }
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    info!("Starting slidegrab v{}", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            std::process::ExitCode::FAILURE
        }
    }
}
