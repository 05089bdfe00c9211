//! In-memory artifact store
//!
//! Keeps every generation in a map, mirroring the additive semantics of the
//! filesystem store. Used when embedding the cache core directly and in
//! tests.

use crate::error::BackupResult;
use crate::store::{Artifact, ArtifactStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Artifact store holding all generations in memory
#[derive(Default)]
pub struct MemoryArtifactStore {
    entries: Mutex<HashMap<(u64, String), Vec<Artifact>>>,
}

impl MemoryArtifactStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored generations across all keys
    pub fn generation_count(&self) -> usize {
        self.entries
            .lock()
            .expect("artifact store lock poisoned")
            .values()
            .map(Vec::len)
            .sum()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn find(&self, subject_id: u64, filename: &str) -> BackupResult<Option<Artifact>> {
        let entries = self.entries.lock().expect("artifact store lock poisoned");
        let found = entries
            .get(&(subject_id, filename.to_string()))
            .and_then(|generations| generations.iter().max_by_key(|a| a.created_at))
            .cloned();
        Ok(found)
    }

    async fn put(&self, artifact: Artifact) -> BackupResult<Artifact> {
        let mut entries = self.entries.lock().expect("artifact store lock poisoned");
        entries
            .entry((artifact.subject_id, artifact.filename.clone()))
            .or_default()
            .push(artifact.clone());
        Ok(artifact)
    }
}
