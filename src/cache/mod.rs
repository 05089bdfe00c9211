//! Export cache coordinator
//!
//! Resolves a download request to an artifact: reuse the stored one while
//! it is fresh, otherwise regenerate through the exporter and persist the
//! result. Regeneration is single-flight per (subject id, filename) key:
//! concurrent missers wait on the key's slot and re-check the store instead
//! of launching duplicate exports.
//!
//! Per-key slot lifecycle: absent -> generating -> absent, with the artifact
//! (or the error) handed to every waiter through the store re-check. A
//! failed generation records nothing and releases the slot so the next
//! caller retries.

pub mod freshness;

pub use freshness::{is_fresh, FreshnessWindow};

use crate::error::BackupResult;
use crate::export::{Exporter, ExportSettings};
use crate::store::{Artifact, ArtifactStore};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

/// Cache key: one artifact lineage per subject and filename
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub subject_id: u64,
    pub filename: String,
}

/// Coordinates artifact reuse and single-flight regeneration
pub struct ExportCache {
    store: Arc<dyn ArtifactStore>,
    window: FreshnessWindow,
    inflight: Mutex<HashMap<ArtifactKey, Arc<AsyncMutex<()>>>>,
}

impl ExportCache {
    /// Create a coordinator over a store with the given freshness window
    pub fn new(store: Arc<dyn ArtifactStore>, window: FreshnessWindow) -> Self {
        Self {
            store,
            window,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// The configured freshness window
    pub fn window(&self) -> FreshnessWindow {
        self.window
    }

    /// Return the cached artifact for the key, regenerating it if missing
    /// or stale
    ///
    /// The exporter runs at most once per key at any time; a failed export
    /// caches nothing and propagates.
    pub async fn get_or_generate(
        &self,
        subject_id: u64,
        filename: &str,
        exporter: &dyn Exporter,
    ) -> BackupResult<Artifact> {
        // Fast path: a fresh artifact needs neither the slot nor the exporter.
        if let Some(artifact) = self.find_fresh(subject_id, filename).await? {
            debug!("Reusing cached export for subject {}", subject_id);
            return Ok(artifact);
        }

        let key = ArtifactKey {
            subject_id,
            filename: filename.to_string(),
        };

        let slot = self.slot(&key);
        let guard = slot.lock().await;
        let result = self.generate_locked(subject_id, filename, exporter).await;
        drop(guard);
        self.release(&key, &slot);

        result
    }

    /// Generation step, entered only while holding the key's slot
    async fn generate_locked(
        &self,
        subject_id: u64,
        filename: &str,
        exporter: &dyn Exporter,
    ) -> BackupResult<Artifact> {
        // Re-check under the slot: the flight we waited on may have just
        // published a fresh artifact.
        if let Some(artifact) = self.find_fresh(subject_id, filename).await? {
            debug!("Export for subject {} published by earlier flight", subject_id);
            return Ok(artifact);
        }

        info!("Generating export for subject {} ({})", subject_id, filename);
        let bytes = exporter
            .export(subject_id, &ExportSettings::restricted())
            .await?;

        self.store
            .put(Artifact::new(subject_id, filename, bytes))
            .await
    }

    async fn find_fresh(
        &self,
        subject_id: u64,
        filename: &str,
    ) -> BackupResult<Option<Artifact>> {
        let found = self.store.find(subject_id, filename).await?;
        Ok(found.filter(|artifact| is_fresh(artifact.created_at, Utc::now(), self.window)))
    }

    /// Get or create the single-flight slot for a key
    fn slot(&self, key: &ArtifactKey) -> Arc<AsyncMutex<()>> {
        let mut inflight = self.inflight.lock().expect("inflight table poisoned");
        inflight.entry(key.clone()).or_default().clone()
    }

    /// Drop the slot once the last waiter leaves; reinsertion is cheap
    fn release(&self, key: &ArtifactKey, slot: &Arc<AsyncMutex<()>>) {
        let mut inflight = self.inflight.lock().expect("inflight table poisoned");
        if let Some(current) = inflight.get(key) {
            if Arc::ptr_eq(current, slot) && Arc::strong_count(current) == 2 {
                inflight.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackupError;
    use crate::store::MemoryArtifactStore;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    struct CountingExporter {
        calls: AtomicUsize,
        delay: Option<StdDuration>,
        fail: bool,
    }

    impl CountingExporter {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: None,
                fail: false,
            }
        }

        fn slow(delay: StdDuration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::new()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Exporter for CountingExporter {
        async fn export(
            &self,
            subject_id: u64,
            _settings: &ExportSettings,
        ) -> BackupResult<Vec<u8>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(BackupError::export_failed(subject_id, "exporter broke"));
            }
            Ok(format!("export-{}-{}", subject_id, call).into_bytes())
        }
    }

    fn cache_with(window: FreshnessWindow) -> (ExportCache, Arc<MemoryArtifactStore>) {
        let store = Arc::new(MemoryArtifactStore::new());
        (ExportCache::new(store.clone(), window), store)
    }

    #[tokio::test]
    async fn cold_key_generates_once() {
        let (cache, store) = cache_with(FreshnessWindow::hours(24));
        let exporter = CountingExporter::new();

        let artifact = cache
            .get_or_generate(12, "intro_quiz.mbz", &exporter)
            .await
            .unwrap();

        assert_eq!(exporter.call_count(), 1);
        assert_eq!(artifact.content, b"export-12-0");
        assert_eq!(store.generation_count(), 1);
    }

    #[tokio::test]
    async fn second_call_reuses_fresh_artifact() {
        let (cache, _store) = cache_with(FreshnessWindow::hours(24));
        let exporter = CountingExporter::new();

        let first = cache
            .get_or_generate(12, "intro_quiz.mbz", &exporter)
            .await
            .unwrap();
        let second = cache
            .get_or_generate(12, "intro_quiz.mbz", &exporter)
            .await
            .unwrap();

        assert_eq!(exporter.call_count(), 1);
        assert_eq!(first.digest, second.digest);
    }

    #[tokio::test]
    async fn artifact_within_window_is_reused() {
        let (cache, store) = cache_with(FreshnessWindow::hours(24));
        let exporter = CountingExporter::new();

        let mut seeded = Artifact::new(12, "a.mbz", b"seeded".to_vec());
        seeded.created_at = Utc::now() - Duration::hours(23);
        store.put(seeded).await.unwrap();

        let artifact = cache.get_or_generate(12, "a.mbz", &exporter).await.unwrap();

        assert_eq!(exporter.call_count(), 0);
        assert_eq!(artifact.content, b"seeded");
    }

    #[tokio::test]
    async fn artifact_past_window_is_regenerated() {
        let (cache, store) = cache_with(FreshnessWindow::hours(24));
        let exporter = CountingExporter::new();

        let mut seeded = Artifact::new(12, "a.mbz", b"seeded".to_vec());
        seeded.created_at = Utc::now() - Duration::hours(25);
        store.put(seeded).await.unwrap();

        let artifact = cache.get_or_generate(12, "a.mbz", &exporter).await.unwrap();

        assert_eq!(exporter.call_count(), 1);
        assert_eq!(artifact.content, b"export-12-0");
        // The stale generation is superseded, not removed.
        assert_eq!(store.generation_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_missers_collapse_to_one_flight() {
        let (cache, _store) = cache_with(FreshnessWindow::hours(24));
        let cache = Arc::new(cache);
        let exporter = Arc::new(CountingExporter::slow(StdDuration::from_millis(50)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let exporter = exporter.clone();
            handles.push(tokio::spawn(async move {
                cache.get_or_generate(12, "a.mbz", exporter.as_ref()).await
            }));
        }

        let mut digests = Vec::new();
        for handle in handles {
            digests.push(handle.await.unwrap().unwrap().digest);
        }

        assert_eq!(exporter.call_count(), 1);
        assert!(digests.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[tokio::test]
    async fn distinct_keys_generate_independently() {
        let (cache, _store) = cache_with(FreshnessWindow::hours(24));
        let exporter = CountingExporter::new();

        cache.get_or_generate(1, "a.mbz", &exporter).await.unwrap();
        cache.get_or_generate(2, "b.mbz", &exporter).await.unwrap();

        assert_eq!(exporter.call_count(), 2);
    }

    #[tokio::test]
    async fn failed_export_caches_nothing_and_allows_retry() {
        let (cache, store) = cache_with(FreshnessWindow::hours(24));

        let failing = CountingExporter::failing();
        let err = cache
            .get_or_generate(12, "a.mbz", &failing)
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::ExportFailed { .. }));
        assert_eq!(store.generation_count(), 0);

        // Slot was released; a later caller generates normally.
        let working = CountingExporter::new();
        let artifact = cache.get_or_generate(12, "a.mbz", &working).await.unwrap();
        assert_eq!(working.call_count(), 1);
        assert_eq!(artifact.content, b"export-12-0");
    }

    #[tokio::test]
    async fn slot_table_drains_after_flight() {
        let (cache, _store) = cache_with(FreshnessWindow::hours(24));
        let exporter = CountingExporter::new();

        cache.get_or_generate(12, "a.mbz", &exporter).await.unwrap();

        let inflight = cache.inflight.lock().unwrap();
        assert!(inflight.is_empty());
    }
}
