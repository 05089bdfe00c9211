//! Cache command - inspect or prune the artifact store

use crate::cli::args::{CacheAction, CacheArgs};
use crate::config::{Config, ConfigManager};
use crate::error::BackupResult;
use crate::store::{FsArtifactStore, GenerationInfo};
use chrono::{Duration, Utc};
use console::style;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> BackupResult<()> {
    let root = config
        .export
        .storage_dir
        .clone()
        .unwrap_or_else(ConfigManager::artifacts_dir);
    let store = FsArtifactStore::new(root);

    match args.action {
        CacheAction::List => list_generations(&store).await,
        CacheAction::Gc { days, dry_run } => gc_generations(&store, days, dry_run).await,
    }
}

/// List all stored artifact generations
async fn list_generations(store: &FsArtifactStore) -> BackupResult<()> {
    let infos = store.list().await?;

    if infos.is_empty() {
        println!("No cached artifacts found.");
        return Ok(());
    }

    println!(
        "{:<10} {:<30} {:<10} {:<20}",
        "SUBJECT", "FILENAME", "SIZE", "CREATED"
    );
    println!("{}", "-".repeat(72));

    for info in &infos {
        println!(
            "{:<10} {:<30} {:<10} {:<20}",
            info.subject_id,
            info.filename,
            format_bytes(info.size),
            info.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    println!();
    println!("Total: {} generation(s)", infos.len());
    Ok(())
}

/// Remove generations older than the cutoff
async fn gc_generations(store: &FsArtifactStore, days: u32, dry_run: bool) -> BackupResult<()> {
    let cutoff = Utc::now() - Duration::days(i64::from(days));
    let removed = store.sweep(cutoff, dry_run).await?;

    if removed.is_empty() {
        println!("Nothing older than {} day(s).", days);
        return Ok(());
    }

    let verb = if dry_run { "Would remove" } else { "Removed" };
    for info in &removed {
        println!(
            "{} {} ({}, {})",
            style(verb).yellow(),
            describe(info),
            format_bytes(info.size),
            info.created_at.format("%Y-%m-%d")
        );
    }

    let total: u64 = removed.iter().map(|info| info.size).sum();
    println!();
    println!(
        "{} {} generation(s), {}",
        verb,
        removed.len(),
        format_bytes(total)
    );
    Ok(())
}

fn describe(info: &GenerationInfo) -> String {
    format!("{}/{}", info.subject_id, info.filename)
}

/// Format bytes as human-readable size (e.g., "1.5 MB")
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
