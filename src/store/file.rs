//! File-backed store: one JSON document per diagram.
//!
//! Layout: `<root>/<id>.json`, each file holding the owner and the diagram.
//! Writes go to a sibling `.tmp` file first and are renamed into place, so a
//! crash mid-write leaves the previous version intact.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, warn};

use canvas::doc::{Diagram, DiagramPatch, new_id};

use super::{DocumentStore, StoreError, sort_newest_first};

#[cfg(test)]
#[path = "file_test.rs"]
mod tests;

const EXTENSION: &str = "json";

#[derive(Debug, Serialize, Deserialize)]
struct StoredDiagram {
    owner: String,
    diagram: Diagram,
}

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path for `id`, or `None` when the id could escape the root directory.
    fn path_for(&self, id: &str) -> Option<PathBuf> {
        let safe = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        safe.then(|| self.root.join(format!("{id}.{EXTENSION}")))
    }

    async fn read(&self, id: &str) -> Result<StoredDiagram, StoreError> {
        let path = self.path_for(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(StoreError::NotFound(id.to_string())),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write(&self, stored: &StoredDiagram) -> Result<(), StoreError> {
        let path = self
            .path_for(&stored.diagram.id)
            .ok_or_else(|| StoreError::Backend(format!("invalid diagram id: {}", stored.diagram.id)))?;
        tokio::fs::create_dir_all(&self.root).await?;
        let bytes = serde_json::to_vec_pretty(stored)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for FileStore {
    async fn list(&self, user: &str) -> Result<Vec<Diagram>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            // EDGE: no directory yet means nothing was ever saved.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut diagrams = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != EXTENSION) {
                continue;
            }
            let bytes = tokio::fs::read(&path).await?;
            match serde_json::from_slice::<StoredDiagram>(&bytes) {
                Ok(stored) if stored.owner == user => diagrams.push(stored.diagram),
                Ok(_) => {}
                Err(e) => warn!(error = %e, path = %path.display(), "skipping unreadable diagram file"),
            }
        }
        sort_newest_first(&mut diagrams);
        Ok(diagrams)
    }

    async fn get(&self, id: &str) -> Result<Diagram, StoreError> {
        Ok(self.read(id).await?.diagram)
    }

    async fn create(&self, user: &str, mut diagram: Diagram) -> Result<Diagram, StoreError> {
        let now = OffsetDateTime::now_utc();
        diagram.id = new_id();
        diagram.created_at = now;
        diagram.last_modified = now;

        let stored = StoredDiagram { owner: user.to_string(), diagram };
        self.write(&stored).await?;
        info!(diagram_id = %stored.diagram.id, user, root = %self.root.display(), "diagram created");
        Ok(stored.diagram)
    }

    async fn update(&self, id: &str, patch: &DiagramPatch) -> Result<Diagram, StoreError> {
        let mut stored = self.read(id).await?;
        stored.diagram.apply_patch(patch);
        stored.diagram.last_modified = OffsetDateTime::now_utc();
        self.write(&stored).await?;
        Ok(stored.diagram)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.path_for(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(diagram_id = %id, "diagram deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}
