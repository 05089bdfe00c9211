//! Filesystem-backed artifact store
//!
//! Layout: `<root>/<subject_id>/<filename>/<generation>.bin` plus a
//! `<generation>.json` metadata sidecar. A generation is published by
//! renaming the sidecar into place after the content file; readers only
//! consider generations whose sidecar exists, so a partially written
//! artifact is never visible. Each put gets a fresh generation id, making
//! concurrent puts for the same key safe.

use crate::error::{BackupError, BackupResult};
use crate::store::{content_digest, Artifact, ArtifactStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

const TMP_PREFIX: &str = ".tmp-";

/// Metadata sidecar written next to each generation's content file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GenerationMeta {
    subject_id: u64,
    filename: String,
    created_at: DateTime<Utc>,
    digest: String,
    size: u64,
}

/// Summary of one stored generation, for listing and housekeeping
#[derive(Debug, Clone)]
pub struct GenerationInfo {
    pub subject_id: u64,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub size: u64,
    pub digest: String,
    /// Path of the content file
    pub path: PathBuf,
}

/// Artifact store rooted at a directory on disk
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Create a store rooted at the given directory
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_dir(&self, subject_id: u64, filename: &str) -> PathBuf {
        self.root.join(subject_id.to_string()).join(filename)
    }

    /// Read all published generation sidecars in a key directory
    async fn read_generations(&self, dir: &Path) -> BackupResult<Vec<(String, GenerationMeta)>> {
        let mut generations = Vec::new();

        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(generations),
            Err(e) => {
                return Err(BackupError::io(
                    format!("reading artifact dir {}", dir.display()),
                    e,
                ))
            }
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BackupError::io(format!("reading artifact dir {}", dir.display()), e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(TMP_PREFIX) || !name.ends_with(".json") {
                continue;
            }
            let stem = name.trim_end_matches(".json").to_string();

            let content = match fs::read_to_string(entry.path()).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("Skipping unreadable sidecar {}: {}", name, e);
                    continue;
                }
            };

            match serde_json::from_str::<GenerationMeta>(&content) {
                Ok(meta) => generations.push((stem, meta)),
                Err(e) => warn!("Skipping malformed sidecar {}: {}", name, e),
            }
        }

        Ok(generations)
    }

    /// List every published generation in the store
    pub async fn list(&self) -> BackupResult<Vec<GenerationInfo>> {
        let mut infos = Vec::new();

        let mut subjects = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(infos),
            Err(e) => {
                return Err(BackupError::io(
                    format!("reading store root {}", self.root.display()),
                    e,
                ))
            }
        };

        while let Some(subject) = subjects
            .next_entry()
            .await
            .map_err(|e| BackupError::io("walking store root", e))?
        {
            let mut keys = match fs::read_dir(subject.path()).await {
                Ok(entries) => entries,
                Err(_) => continue,
            };

            while let Some(key) = keys
                .next_entry()
                .await
                .map_err(|e| BackupError::io("walking subject dir", e))?
            {
                let dir = key.path();
                for (stem, meta) in self.read_generations(&dir).await? {
                    infos.push(GenerationInfo {
                        subject_id: meta.subject_id,
                        filename: meta.filename,
                        created_at: meta.created_at,
                        size: meta.size,
                        digest: meta.digest,
                        path: dir.join(format!("{}.bin", stem)),
                    });
                }
            }
        }

        infos.sort_by(|a, b| (a.subject_id, &a.filename, a.created_at).cmp(&(
            b.subject_id,
            &b.filename,
            b.created_at,
        )));
        Ok(infos)
    }

    /// Remove generations created before the cutoff
    ///
    /// Unpublishes the sidecar first so readers never see a generation whose
    /// content file is gone. Returns what was (or would be) removed.
    pub async fn sweep(
        &self,
        cutoff: DateTime<Utc>,
        dry_run: bool,
    ) -> BackupResult<Vec<GenerationInfo>> {
        let mut removed = Vec::new();

        for info in self.list().await? {
            if info.created_at >= cutoff {
                continue;
            }

            if !dry_run {
                let sidecar = info.path.with_extension("json");
                fs::remove_file(&sidecar).await.map_err(|e| {
                    BackupError::io(format!("removing sidecar {}", sidecar.display()), e)
                })?;
                if let Err(e) = fs::remove_file(&info.path).await {
                    warn!("Orphaned content file {}: {}", info.path.display(), e);
                }
            }

            removed.push(info);
        }

        Ok(removed)
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn find(&self, subject_id: u64, filename: &str) -> BackupResult<Option<Artifact>> {
        let dir = self.key_dir(subject_id, filename);
        let mut generations = self.read_generations(&dir).await?;

        // Newest first; fall back through corrupt generations rather than
        // failing the lookup.
        generations.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));

        for (stem, meta) in generations {
            let bin = dir.join(format!("{}.bin", stem));
            let content = match fs::read(&bin).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("Skipping unreadable artifact {}: {}", bin.display(), e);
                    continue;
                }
            };

            if content_digest(&content) != meta.digest {
                warn!("Digest mismatch for {}, skipping generation", bin.display());
                continue;
            }

            return Ok(Some(Artifact {
                subject_id: meta.subject_id,
                filename: meta.filename,
                content,
                created_at: meta.created_at,
                digest: meta.digest,
            }));
        }

        Ok(None)
    }

    async fn put(&self, artifact: Artifact) -> BackupResult<Artifact> {
        let dir = self.key_dir(artifact.subject_id, &artifact.filename);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| BackupError::io(format!("creating artifact dir {}", dir.display()), e))?;

        let generation = Uuid::new_v4().simple().to_string();
        let meta = GenerationMeta {
            subject_id: artifact.subject_id,
            filename: artifact.filename.clone(),
            created_at: artifact.created_at,
            digest: artifact.digest.clone(),
            size: artifact.size(),
        };

        // Content first, then the sidecar that publishes it.
        let bin_tmp = dir.join(format!("{}{}.bin", TMP_PREFIX, generation));
        let bin = dir.join(format!("{}.bin", generation));
        fs::write(&bin_tmp, &artifact.content)
            .await
            .map_err(|e| BackupError::io(format!("writing artifact {}", bin_tmp.display()), e))?;
        fs::rename(&bin_tmp, &bin)
            .await
            .map_err(|e| BackupError::io(format!("publishing artifact {}", bin.display()), e))?;

        let sidecar_tmp = dir.join(format!("{}{}.json", TMP_PREFIX, generation));
        let sidecar = dir.join(format!("{}.json", generation));
        let encoded = serde_json::to_vec_pretty(&meta)?;
        fs::write(&sidecar_tmp, encoded)
            .await
            .map_err(|e| BackupError::io(format!("writing sidecar {}", sidecar_tmp.display()), e))?;
        fs::rename(&sidecar_tmp, &sidecar)
            .await
            .map_err(|e| BackupError::io(format!("publishing sidecar {}", sidecar.display()), e))?;

        debug!(
            "Stored artifact {}/{} ({} bytes)",
            artifact.subject_id,
            artifact.filename,
            artifact.size()
        );

        Ok(artifact)
    }
}
