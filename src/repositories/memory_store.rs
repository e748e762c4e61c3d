use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{SnapshotKey, SnapshotStore};
use crate::models::SnapshotResult;

/// Process-local snapshot store
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: RwLock<HashMap<SnapshotKey, String>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots
    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(&self, key: &SnapshotKey) -> SnapshotResult<Option<String>> {
        Ok(self.snapshots.read().await.get(key).cloned())
    }

    async fn save(&self, key: &SnapshotKey, payload: &str) -> SnapshotResult<()> {
        self.snapshots
            .write()
            .await
            .insert(key.clone(), payload.to_string());
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
