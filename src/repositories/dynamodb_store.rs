use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, instrument, Instrument};

use super::{SnapshotKey, SnapshotStore};
use crate::models::{SnapshotError, SnapshotResult};

const KEY_ATTRIBUTE: &str = "snapshot_key";
const PAYLOAD_ATTRIBUTE: &str = "payload";
const UPDATED_AT_ATTRIBUTE: &str = "updated_at";

/// DynamoDB implementation of the SnapshotStore trait.
///
/// One item per key; the partition key is `"<origin>#<name>"`.
pub struct DynamoDbSnapshotStore {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbSnapshotStore {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            table_name,
            region,
        }
    }

    fn create_dynamodb_span(&self, operation: &str) -> tracing::Span {
        tracing::info_span!(
            "DynamoDB",
            "aws.service" = "DynamoDB",
            "aws.operation" = operation,
            "aws.region" = %self.region,
            "aws.dynamodb.table_name" = %self.table_name,
            "otel.kind" = "client",
            "otel.name" = format!("DynamoDB.{}", operation),
            "db.system" = "dynamodb",
            "db.name" = %self.table_name,
            "db.operation" = operation,
        )
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Partition key value for a snapshot key
    pub fn partition_key(key: &SnapshotKey) -> String {
        format!("{}#{}", key.origin(), key.name())
    }

    /// Convert a snapshot to DynamoDB attribute values
    pub fn snapshot_to_item(
        &self,
        key: &SnapshotKey,
        payload: &str,
    ) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();
        item.insert(
            KEY_ATTRIBUTE.to_string(),
            AttributeValue::S(Self::partition_key(key)),
        );
        item.insert(
            PAYLOAD_ATTRIBUTE.to_string(),
            AttributeValue::S(payload.to_string()),
        );
        item.insert(
            UPDATED_AT_ATTRIBUTE.to_string(),
            AttributeValue::S(Utc::now().to_rfc3339()),
        );
        item
    }

    /// Extract the snapshot payload from a DynamoDB item
    pub fn item_to_snapshot(
        &self,
        item: &HashMap<String, AttributeValue>,
    ) -> SnapshotResult<String> {
        item.get(PAYLOAD_ATTRIBUTE)
            .and_then(|v| v.as_s().ok())
            .cloned()
            .ok_or_else(|| SnapshotError::InvalidRecord {
                message: "Missing payload attribute".to_string(),
            })
    }

    fn map_dynamodb_error(&self, error: DynamoDbError) -> SnapshotError {
        error!("DynamoDB error: {:?}", error);
        SnapshotError::AwsSdk {
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl SnapshotStore for DynamoDbSnapshotStore {
    #[instrument(skip(self), fields(table = %self.table_name, key = %key))]
    async fn load(&self, key: &SnapshotKey) -> SnapshotResult<Option<String>> {
        let get_span = self.create_dynamodb_span("GetItem");

        let response = async {
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key(KEY_ATTRIBUTE, AttributeValue::S(Self::partition_key(key)))
                .consistent_read(true)
                .send()
                .await
                .map_err(|e| self.map_dynamodb_error(e.into()))
        }
        .instrument(get_span)
        .await?;

        match response.item {
            Some(item) => {
                debug!("Snapshot found");
                self.item_to_snapshot(&item).map(Some)
            }
            None => {
                debug!("Snapshot not found");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, payload), fields(table = %self.table_name, key = %key, bytes = payload.len()))]
    async fn save(&self, key: &SnapshotKey, payload: &str) -> SnapshotResult<()> {
        let item = self.snapshot_to_item(key, payload);
        let put_span = self.create_dynamodb_span("PutItem");

        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .send()
                .await
                .map_err(|e| self.map_dynamodb_error(e.into()))
        }
        .instrument(put_span)
        .await?;

        debug!("Snapshot saved");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "dynamodb"
    }
}
