//! Persistent project state store.
//!
//! One JSON document per project id under `<root>/<id>.json`. Round-trip
//! stability of [`ProjectState`] is the only format contract.

use std::path::PathBuf;

use reelsmith_core::project::ProjectState;

/// Errors from reading or writing persisted project state.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode or decode project state: {0}")]
    Serde(#[from] serde_json::Error),
}

/// File-backed store of [`ProjectState`] records keyed by project id.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    /// Write (or overwrite) the record for `project.id`.
    pub async fn save(&self, project: &ProjectState) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let bytes = serde_json::to_vec_pretty(project)?;
        tokio::fs::write(self.path_for(&project.id), bytes).await?;
        Ok(())
    }

    /// Load a record by id, `None` when absent.
    pub async fn load(&self, id: &str) -> Result<Option<ProjectState>, StoreError> {
        let bytes = match tokio::fs::read(self.path_for(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Load every parseable record. Records that fail to parse are logged
    /// and skipped rather than failing the listing.
    pub async fn list(&self) -> Result<Vec<ProjectState>, StoreError> {
        let mut out = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match tokio::fs::read(&path).await {
                Ok(bytes) => match serde_json::from_slice::<ProjectState>(&bytes) {
                    Ok(project) => out.push(project),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable project record");
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable project record");
                }
            }
        }
        Ok(out)
    }

    /// Delete a record. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
