//! Serve command - run the download/panel HTTP server

use crate::access::{AccessGate, StaticAuthorizer};
use crate::audit::AuditLog;
use crate::cache::{ExportCache, FreshnessWindow};
use crate::cli::args::ServeArgs;
use crate::config::{Config, ConfigManager};
use crate::error::{BackupError, BackupResult};
use crate::export::CommandExporter;
use crate::http::{router, AppState};
use crate::link::{JsonFieldStore, LinkResolver};
use crate::panel::Panel;
use crate::store::FsArtifactStore;
use crate::subject::JsonSubjectDirectory;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: &Config) -> BackupResult<()> {
    let state = build_state(config)?;

    let listen = args.listen.unwrap_or_else(|| config.server.listen.clone());
    let listener = TcpListener::bind(&listen)
        .await
        .map_err(|_| BackupError::ListenAddrInvalid(listen.clone()))?;

    info!("Serving on http://{}", listen);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| BackupError::io("serving HTTP", e))
}

/// Wire the collaborators described in config into shared app state
fn build_state(config: &Config) -> BackupResult<AppState> {
    let subjects_file = config.platform.subjects_file.clone().ok_or_else(|| {
        BackupError::SubjectDirectoryUnavailable {
            reason: "no subjects_file configured".to_string(),
        }
    })?;
    let subjects = Arc::new(JsonSubjectDirectory::new(subjects_file));

    let gate = AccessGate::new(Arc::new(StaticAuthorizer::from_config(&config.access)));

    let storage_dir = config
        .export
        .storage_dir
        .clone()
        .unwrap_or_else(ConfigManager::artifacts_dir);
    let store = Arc::new(FsArtifactStore::new(storage_dir));
    let window = FreshnessWindow::hours(config.export.freshness_hours as i64);
    let cache = Arc::new(ExportCache::new(store, window));

    let exporter = Arc::new(CommandExporter::new(config.export.command.clone())?);

    let fields = match &config.platform.records_file {
        Some(path) => JsonFieldStore::new(path.clone()),
        None => JsonFieldStore::empty(),
    };
    let panel = Arc::new(Panel::new(
        gate.clone(),
        LinkResolver::new(Arc::new(fields)),
        config.link.clone(),
    ));

    Ok(AppState {
        subjects,
        gate,
        cache,
        exporter,
        panel,
        audit: Arc::new(AuditLog::new(config)),
        download_cache_secs: config.server.download_cache_secs,
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    } else {
        info!("Shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_requires_subjects_file() {
        let config = Config::default();
        let err = build_state(&config).unwrap_err();
        assert!(matches!(
            err,
            BackupError::SubjectDirectoryUnavailable { .. }
        ));
    }

    #[test]
    fn state_requires_export_command() {
        let mut config = Config::default();
        config.platform.subjects_file = Some("/tmp/subjects.json".into());
        let err = build_state(&config).unwrap_err();
        assert!(matches!(err, BackupError::ExporterNotConfigured));
    }

    #[test]
    fn state_builds_with_minimal_config() {
        let mut config = Config::default();
        config.platform.subjects_file = Some("/tmp/subjects.json".into());
        config.export.command = vec!["backup-tool".to_string(), "{subject}".to_string()];

        let state = build_state(&config).unwrap();
        assert_eq!(state.download_cache_secs, 300);
    }
}
