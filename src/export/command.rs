//! Command-based exporter
//!
//! Bridges to the host platform's export pipeline by shelling out to a
//! configured command. The command receives the subject id via `{subject}`
//! argv substitution, learns the sanitization settings from environment
//! variables, and must write the package bytes to stdout.

use crate::error::{BackupError, BackupResult};
use crate::export::{Exporter, ExportSettings};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Exporter that runs a configured host command
#[derive(Debug)]
pub struct CommandExporter {
    argv: Vec<String>,
}

impl CommandExporter {
    /// Create an exporter from a command argv template
    pub fn new(argv: Vec<String>) -> BackupResult<Self> {
        if argv.is_empty() {
            return Err(BackupError::ExporterNotConfigured);
        }
        Ok(Self { argv })
    }

    /// Substitute the subject id into the argv template
    fn render_argv(&self, subject_id: u64) -> Vec<String> {
        self.argv
            .iter()
            .map(|arg| arg.replace("{subject}", &subject_id.to_string()))
            .collect()
    }
}

fn flag(enabled: bool) -> &'static str {
    if enabled {
        "1"
    } else {
        "0"
    }
}

#[async_trait]
impl Exporter for CommandExporter {
    async fn export(&self, subject_id: u64, settings: &ExportSettings) -> BackupResult<Vec<u8>> {
        let args = self.render_argv(subject_id);
        debug!("Executing exporter: {:?}", args);

        let output = Command::new(&args[0])
            .args(&args[1..])
            .env("AUTOBACKUP_INCLUDE_USERS", flag(settings.include_users))
            .env("AUTOBACKUP_INCLUDE_BLOCKS", flag(settings.include_blocks))
            .env("AUTOBACKUP_INCLUDE_FILTERS", flag(settings.include_filters))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                BackupError::export_failed(subject_id, format!("spawning {}: {}", args[0], e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackupError::export_failed(
                subject_id,
                format!("exporter exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        if output.stdout.is_empty() {
            return Err(BackupError::export_failed(
                subject_id,
                "exporter produced no output",
            ));
        }

        Ok(output.stdout)
    }
}
