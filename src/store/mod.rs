//! Artifact storage
//!
//! Generated export packages keyed by (subject id, filename). Artifacts are
//! immutable once written; a newer generation with the same filename
//! supersedes an older one, it never mutates it in place. Retention of old
//! generations is a housekeeping concern handled outside the cache core
//! (see the `cache gc` CLI command).

pub mod fs;
pub mod memory;

pub use fs::{FsArtifactStore, GenerationInfo};
pub use memory::MemoryArtifactStore;

use crate::error::BackupResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// A generated export package
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Owning subject id
    pub subject_id: u64,

    /// Package filename, already sanitized
    pub filename: String,

    /// Opaque package bytes
    pub content: Vec<u8>,

    /// When the artifact was generated
    pub created_at: DateTime<Utc>,

    /// SHA-256 digest of the content, hex encoded
    pub digest: String,
}

impl Artifact {
    /// Create an artifact stamped with the current time
    pub fn new(subject_id: u64, filename: impl Into<String>, content: Vec<u8>) -> Self {
        let digest = content_digest(&content);
        Self {
            subject_id,
            filename: filename.into(),
            content,
            created_at: Utc::now(),
            digest,
        }
    }

    /// Content size in bytes
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Hex-encoded SHA-256 digest of content bytes
pub fn content_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Durable storage seam for artifacts
///
/// `put` is additive: a new generation record per call, never an in-place
/// overwrite. Readers must never observe a partially written artifact.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Most recent artifact for the key, or `None`; absence is not an error
    async fn find(&self, subject_id: u64, filename: &str) -> BackupResult<Option<Artifact>>;

    /// Persist a new artifact generation and return it
    async fn put(&self, artifact: Artifact) -> BackupResult<Artifact>;
}
