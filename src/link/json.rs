//! JSON-file-backed field store
//!
//! Stand-in for the host platform's record store in standalone deployments.
//! The file holds an array of records with their field content; queries
//! re-read it so host-side edits show up without a restart.

use crate::error::{BackupError, BackupResult};
use crate::link::{FieldStore, LinkTarget};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Field store reading records from a JSON file
pub struct JsonFieldStore {
    path: Option<PathBuf>,
}

impl JsonFieldStore {
    /// Create a store reading from the given file
    pub fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// A store with no backing file; every query matches nothing
    pub fn empty() -> Self {
        Self { path: None }
    }

    async fn load(&self) -> BackupResult<Vec<LinkTarget>> {
        let Some(path) = &self.path else {
            return Ok(vec![]);
        };

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| BackupError::FieldStore(format!("{}: {}", path.display(), e)))?;

        serde_json::from_str(&content)
            .map_err(|e| BackupError::FieldStore(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl FieldStore for JsonFieldStore {
    async fn query(
        &self,
        record_module_id: u64,
        field_id: u64,
        suffix: &str,
    ) -> BackupResult<Vec<LinkTarget>> {
        let needle = suffix.to_lowercase();

        let mut matches: Vec<LinkTarget> = self
            .load()
            .await?
            .into_iter()
            .filter(|target| {
                target.record_module_id == record_module_id
                    && target.field_id == field_id
                    && target.content.to_lowercase().ends_with(&needle)
            })
            .collect();

        matches.sort_by_key(|target| target.id);
        Ok(matches)
    }
}
