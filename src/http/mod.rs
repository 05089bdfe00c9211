//! HTTP surface
//!
//! | Route                    | Description                              |
//! |--------------------------|------------------------------------------|
//! | `GET /health`            | Liveness probe                           |
//! | `GET /subjects/:id/backup` | Download the subject's sanitized export |
//! | `GET /subjects/:id/panel`  | Structured panel content as JSON        |
//!
//! Authorization failures return an empty body with a denial status —
//! nothing is rendered for actors without the capability. The actor id
//! comes from a request header; real deployments sit behind the host
//! platform's login layer which populates it.

use crate::access::{AccessGate, Actor, CAP_DOWNLOAD};
use crate::audit::AuditLog;
use crate::cache::ExportCache;
use crate::export::{backup_filename, Exporter};
use crate::error::BackupError;
use crate::panel::Panel;
use crate::subject::{self, SubjectDirectory};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Header carrying the authenticated actor id
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub subjects: Arc<dyn SubjectDirectory>,
    pub gate: AccessGate,
    pub cache: Arc<ExportCache>,
    pub exporter: Arc<dyn Exporter>,
    pub panel: Arc<Panel>,
    pub audit: Arc<AuditLog>,
    pub download_cache_secs: u32,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("download_cache_secs", &self.download_cache_secs)
            .finish_non_exhaustive()
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/subjects/:id/backup", get(download_backup))
        .route("/subjects/:id/panel", get(panel_content))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

fn actor_from(headers: &HeaderMap) -> Option<Actor> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|id| !id.is_empty())
        .map(Actor::new)
}

/// GET /subjects/:id/backup
async fn download_backup(
    State(state): State<AppState>,
    Path(subject_id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    // No identified actor means no body, same as a capability miss.
    let Some(actor) = actor_from(&headers) else {
        return StatusCode::FORBIDDEN.into_response();
    };

    let subject = match subject::require(state.subjects.as_ref(), subject_id).await {
        Ok(subject) => subject,
        Err(BackupError::SubjectNotFound(_)) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            error!("Subject lookup failed: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match state.gate.allowed(CAP_DOWNLOAD, &actor, subject_id).await {
        Ok(true) => {}
        Ok(false) => {
            state
                .audit
                .log(
                    "download.denied",
                    &serde_json::json!({"subject": subject_id, "actor": actor.id}),
                )
                .await;
            return StatusCode::FORBIDDEN.into_response();
        }
        Err(e) => {
            error!("Capability check failed: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let filename = backup_filename(&subject.name);
    match state
        .cache
        .get_or_generate(subject_id, &filename, state.exporter.as_ref())
        .await
    {
        Ok(artifact) => {
            state
                .audit
                .log(
                    "download.served",
                    &serde_json::json!({
                        "subject": subject_id,
                        "actor": actor.id,
                        "filename": artifact.filename,
                        "size": artifact.size(),
                        "digest": artifact.digest,
                    }),
                )
                .await;

            (
                StatusCode::OK,
                [
                    (
                        header::CONTENT_TYPE,
                        "application/octet-stream".to_string(),
                    ),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", artifact.filename),
                    ),
                    (
                        header::CACHE_CONTROL,
                        format!("private, max-age={}", state.download_cache_secs),
                    ),
                ],
                artifact.content,
            )
                .into_response()
        }
        Err(e) => {
            error!("Export failed for subject {}: {}", subject_id, e);
            state
                .audit
                .log(
                    "export.failed",
                    &serde_json::json!({"subject": subject_id, "reason": e.to_string()}),
                )
                .await;
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /subjects/:id/panel
async fn panel_content(
    State(state): State<AppState>,
    Path(subject_id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    let Some(actor) = actor_from(&headers) else {
        return StatusCode::FORBIDDEN.into_response();
    };

    let subject = match subject::require(state.subjects.as_ref(), subject_id).await {
        Ok(subject) => subject,
        Err(BackupError::SubjectNotFound(_)) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            error!("Subject lookup failed: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match state.panel.content(&subject, &actor).await {
        Ok(content) => Json(content).into_response(),
        Err(e) => {
            error!("Panel composition failed for subject {}: {}", subject_id, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
