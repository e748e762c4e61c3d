use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use super::{SnapshotKey, SnapshotStore};
use crate::models::SnapshotResult;

/// File-backed snapshot store.
///
/// Each key maps to `<root>/<origin>/<name>.json`. Writes go to a sibling
/// temporary file that is then renamed over the target.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    root: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the snapshot file for a key
    pub fn snapshot_path(&self, key: &SnapshotKey) -> PathBuf {
        self.root
            .join(key.origin())
            .join(format!("{}.json", key.name()))
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    #[instrument(skip(self), fields(key = %key))]
    async fn load(&self, key: &SnapshotKey) -> SnapshotResult<Option<String>> {
        let path = self.snapshot_path(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(payload) => {
                debug!(path = %path.display(), bytes = payload.len(), "Snapshot loaded");
                Ok(Some(payload))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, payload), fields(key = %key, bytes = payload.len()))]
    async fn save(&self, key: &SnapshotKey, payload: &str) -> SnapshotResult<()> {
        let path = self.snapshot_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, payload).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        debug!(path = %path.display(), "Snapshot written");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}
