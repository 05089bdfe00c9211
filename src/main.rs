//! Autobackup - On-Demand Sanitized Activity Exports
//!
//! CLI entry point that dispatches to subcommands.

use autobackup::cli::{Cli, Commands};
use autobackup::config::ConfigManager;
use autobackup::error::BackupResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> BackupResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("autobackup=warn"),
        1 => EnvFilter::new("autobackup=info"),
        _ => EnvFilter::new("autobackup=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    // Load configuration
    let manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = manager.load().await?;

    // Dispatch to command
    match cli.command {
        Commands::Serve(args) => {
            ConfigManager::ensure_state_dirs().await?;
            autobackup::cli::commands::serve(args, &config).await
        }
        Commands::Cache(args) => autobackup::cli::commands::cache(args, &config).await,
        Commands::Config(args) => autobackup::cli::commands::config(args, &config, &manager).await,
    }
}
