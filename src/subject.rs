//! Subjects - the content units being exported
//!
//! A subject is one activity on the host platform. The platform owns the
//! authoritative listing; this module only defines the lookup seam and a
//! JSON-file-backed directory for standalone deployments.

use crate::error::{BackupError, BackupResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// An exportable unit of content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    /// Unique subject id
    pub id: u64,

    /// Human-readable display name, used to derive the artifact filename
    pub name: String,
}

/// Lookup seam for subjects owned by the host platform
#[async_trait]
pub trait SubjectDirectory: Send + Sync {
    /// Look up a subject by id; absence is `Ok(None)`, never an error
    async fn find(&self, subject_id: u64) -> BackupResult<Option<Subject>>;
}

/// Look up a subject that must exist for the request to proceed
pub async fn require(
    directory: &dyn SubjectDirectory,
    subject_id: u64,
) -> BackupResult<Subject> {
    directory
        .find(subject_id)
        .await?
        .ok_or(BackupError::SubjectNotFound(subject_id))
}

/// Subject directory backed by a JSON file
///
/// The file holds an array of `{ "id": .., "name": ".." }` objects and is
/// re-read on every lookup so edits on the host side are picked up without
/// a restart.
pub struct JsonSubjectDirectory {
    path: PathBuf,
}

impl JsonSubjectDirectory {
    /// Create a directory reading from the given file
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn load(&self) -> BackupResult<Vec<Subject>> {
        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            BackupError::SubjectDirectoryUnavailable {
                reason: format!("{}: {}", self.path.display(), e),
            }
        })?;

        serde_json::from_str(&content).map_err(|e| BackupError::SubjectDirectoryUnavailable {
            reason: format!("{}: {}", self.path.display(), e),
        })
    }
}

#[async_trait]
impl SubjectDirectory for JsonSubjectDirectory {
    async fn find(&self, subject_id: u64) -> BackupResult<Option<Subject>> {
        let subjects = self.load().await?;
        Ok(subjects.into_iter().find(|s| s.id == subject_id))
    }
}
