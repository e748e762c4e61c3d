// Repositories module - snapshot persistence layer

pub mod dynamodb_store;
pub mod file_store;
pub mod memory_store;

#[cfg(test)]
mod tests;

pub use dynamodb_store::DynamoDbSnapshotStore;
pub use file_store::FileSnapshotStore;
pub use memory_store::InMemorySnapshotStore;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};
use crate::models::{validate_key_segment, SnapshotResult, ValidationResult};

/// Identifies one durable snapshot record: a record name within a storage origin
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    origin: String,
    name: String,
}

impl SnapshotKey {
    pub fn new(origin: &str, name: &str) -> ValidationResult<Self> {
        validate_key_segment("origin", origin)?;
        validate_key_segment("snapshot_key", name)?;
        Ok(Self {
            origin: origin.to_string(),
            name: name.to_string(),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.origin, self.name)
    }
}

/// Trait defining the interface for durable key-value snapshot storage.
///
/// A `save` fully replaces whatever was stored under the key before.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the latest snapshot for a key, `None` if nothing was stored
    async fn load(&self, key: &SnapshotKey) -> SnapshotResult<Option<String>>;

    /// Store a snapshot, overwriting any previous one
    async fn save(&self, key: &SnapshotKey, payload: &str) -> SnapshotResult<()>;

    /// Backend label for logs and metrics
    fn backend(&self) -> &'static str;
}

/// Build the snapshot store selected by configuration
pub async fn snapshot_store_from_config(config: &StorageConfig) -> Arc<dyn SnapshotStore> {
    match config.backend {
        StorageBackend::File => {
            info!(data_dir = %config.data_dir, "Using file snapshot store");
            Arc::new(FileSnapshotStore::new(&config.data_dir))
        }
        StorageBackend::Memory => {
            info!("Using in-memory snapshot store");
            Arc::new(InMemorySnapshotStore::new())
        }
        StorageBackend::DynamoDb => {
            info!(
                table = %config.snapshots_table_name,
                region = %config.region,
                "Using DynamoDB snapshot store"
            );
            let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(config.region.clone()))
                .load()
                .await;
            let client = Arc::new(aws_sdk_dynamodb::Client::new(&aws_config));
            Arc::new(DynamoDbSnapshotStore::new(
                client,
                config.snapshots_table_name.clone(),
                config.region.clone(),
            ))
        }
    }
}
