//! Content-addressed stage output store.
//!
//! Layout on disk: `<root>/pipeline/<cache-key>/<stage>.json`, each file an
//! envelope `{ stage, written_at, payload }`. TTL is evaluated against the
//! envelope's write timestamp, so entries survive file copies unchanged.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use reelsmith_core::cache_key::CacheKey;
use reelsmith_core::project::PipelineStage;

/// On-disk wrapper around one stage's cached payload.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    stage: String,
    written_at: DateTime<Utc>,
    payload: serde_json::Value,
}

/// Summary counters for the cache directory.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Number of distinct cache keys with at least one entry.
    pub keys: u64,
    /// Number of stage entries across all keys.
    pub entries: u64,
    pub total_bytes: u64,
    pub enabled: bool,
    pub ttl_secs: u64,
}

/// File-backed cache of pipeline stage outputs, keyed by
/// `(CacheKey, PipelineStage)`.
///
/// Safe for concurrent use across distinct keys. For a single key the
/// orchestrator enforces at most one producer per run; concurrent runs
/// with identical inputs may race on the same entry, which is benign
/// because the payload is idempotent (last writer wins).
#[derive(Debug, Clone)]
pub struct PipelineCache {
    root: PathBuf,
    enabled: bool,
    ttl: Duration,
}

impl PipelineCache {
    /// Create a cache rooted at `<root>/pipeline`.
    pub fn new(root: impl Into<PathBuf>, enabled: bool, ttl: Duration) -> Self {
        Self {
            root: root.into().join("pipeline"),
            enabled,
            ttl,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key_dir(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    fn entry_path(&self, key: &CacheKey, stage: PipelineStage) -> PathBuf {
        self.key_dir(key).join(format!("{}.json", stage.as_str()))
    }

    fn is_expired(&self, written_at: DateTime<Utc>) -> bool {
        let age = Utc::now().signed_duration_since(written_at);
        age > chrono::Duration::milliseconds(self.ttl.as_millis() as i64)
    }

    /// Retrieve a stage's cached output.
    ///
    /// Returns `None` when caching is disabled, the entry is absent, the
    /// entry has outlived the TTL (evicted as a side effect), or the stored
    /// bytes fail to deserialize (also evicted). A cache problem is never
    /// surfaced to the caller.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey, stage: PipelineStage) -> Option<T> {
        if !self.enabled {
            return None;
        }

        let path = self.entry_path(key, stage);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(_) => return None,
        };

        let envelope: CacheEnvelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(
                    stage = stage.as_str(),
                    path = %path.display(),
                    error = %e,
                    "Evicting unreadable cache entry",
                );
                let _ = tokio::fs::remove_file(&path).await;
                return None;
            }
        };

        if self.is_expired(envelope.written_at) {
            tracing::debug!(
                stage = stage.as_str(),
                written_at = %envelope.written_at,
                "Evicting expired cache entry",
            );
            let _ = tokio::fs::remove_file(&path).await;
            return None;
        }

        match serde_json::from_value(envelope.payload) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    stage = stage.as_str(),
                    path = %path.display(),
                    error = %e,
                    "Evicting cache entry with mismatched payload",
                );
                let _ = tokio::fs::remove_file(&path).await;
                None
            }
        }
    }

    /// Store a stage's output. Failures are logged and swallowed — a
    /// missed write only costs a recomputation on the next run.
    pub async fn set<T: Serialize>(&self, key: &CacheKey, stage: PipelineStage, value: &T) {
        if !self.enabled {
            return;
        }

        let payload = match serde_json::to_value(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(stage = stage.as_str(), error = %e, "Failed to serialize cache payload");
                return;
            }
        };
        let envelope = CacheEnvelope {
            stage: stage.as_str().to_string(),
            written_at: Utc::now(),
            payload,
        };
        let bytes = match serde_json::to_vec_pretty(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(stage = stage.as_str(), error = %e, "Failed to serialize cache envelope");
                return;
            }
        };

        let dir = self.key_dir(key);
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            tracing::warn!(path = %dir.display(), error = %e, "Failed to create cache directory");
            return;
        }
        let path = self.entry_path(key, stage);
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write cache entry");
        }
    }

    /// Whether a live (present, parseable, unexpired) entry exists.
    pub async fn contains(&self, key: &CacheKey, stage: PipelineStage) -> bool {
        self.get::<serde_json::Value>(key, stage).await.is_some()
    }

    /// Remove one stage entry, or every entry for the key when `stage` is
    /// `None`.
    pub async fn invalidate(&self, key: &CacheKey, stage: Option<PipelineStage>) {
        match stage {
            Some(stage) => {
                let _ = tokio::fs::remove_file(self.entry_path(key, stage)).await;
            }
            None => {
                let _ = tokio::fs::remove_dir_all(self.key_dir(key)).await;
            }
        }
    }

    /// Remove every expired or unreadable entry and prune empty key
    /// directories. Returns the number of entries removed. Idempotent.
    pub async fn sweep_expired(&self) -> u64 {
        let mut removed = 0;
        let mut key_dirs = match tokio::fs::read_dir(&self.root).await {
            Ok(dirs) => dirs,
            Err(_) => return 0,
        };

        while let Ok(Some(key_entry)) = key_dirs.next_entry().await {
            let key_path = key_entry.path();
            if !key_path.is_dir() {
                continue;
            }

            let mut remaining = 0u64;
            let mut files = match tokio::fs::read_dir(&key_path).await {
                Ok(files) => files,
                Err(_) => continue,
            };
            while let Ok(Some(file)) = files.next_entry().await {
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let expired = match tokio::fs::read(&path).await {
                    Ok(bytes) => match serde_json::from_slice::<CacheEnvelope>(&bytes) {
                        Ok(envelope) => self.is_expired(envelope.written_at),
                        // Unreadable entries are swept along with expired ones.
                        Err(_) => true,
                    },
                    Err(_) => continue,
                };
                if expired && tokio::fs::remove_file(&path).await.is_ok() {
                    removed += 1;
                } else {
                    remaining += 1;
                }
            }

            if remaining == 0 {
                let _ = tokio::fs::remove_dir(&key_path).await;
            }
        }

        removed
    }

    /// Remove every entry. Returns the number of entries removed.
    pub async fn clear(&self) -> u64 {
        let stats = self.stats().await;
        let _ = tokio::fs::remove_dir_all(&self.root).await;
        stats.entries
    }

    /// Count keys, entries, and bytes currently on disk.
    pub async fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            keys: 0,
            entries: 0,
            total_bytes: 0,
            enabled: self.enabled,
            ttl_secs: self.ttl.as_secs(),
        };

        let mut key_dirs = match tokio::fs::read_dir(&self.root).await {
            Ok(dirs) => dirs,
            Err(_) => return stats,
        };
        while let Ok(Some(key_entry)) = key_dirs.next_entry().await {
            let key_path = key_entry.path();
            if !key_path.is_dir() {
                continue;
            }
            stats.keys += 1;
            let mut files = match tokio::fs::read_dir(&key_path).await {
                Ok(files) => files,
                Err(_) => continue,
            };
            while let Ok(Some(file)) = files.next_entry().await {
                if file.path().extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                stats.entries += 1;
                if let Ok(meta) = file.metadata().await {
                    stats.total_bytes += meta.len();
                }
            }
        }

        stats
    }
}
