mod snapshot_store_tests {
    use aws_sdk_dynamodb::types::AttributeValue;
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::models::SnapshotError;
    use crate::repositories::*;

    fn create_test_client() -> Arc<aws_sdk_dynamodb::Client> {
        let config = aws_sdk_dynamodb::Config::builder()
            .region(aws_sdk_dynamodb::config::Region::new("us-east-1"))
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .build();
        Arc::new(aws_sdk_dynamodb::Client::from_conf(config))
    }

    fn key(origin: &str) -> SnapshotKey {
        SnapshotKey::new(origin, "laundry_cart").unwrap()
    }

    #[test]
    fn test_snapshot_key_display_and_validation() {
        let key = key("shop-1");
        assert_eq!(key.to_string(), "shop-1/laundry_cart");
        assert_eq!(key.origin(), "shop-1");
        assert_eq!(key.name(), "laundry_cart");

        assert!(SnapshotKey::new("../escape", "laundry_cart").is_err());
        assert!(SnapshotKey::new("default", "").is_err());
    }

    mod file_store_tests {
        use super::*;

        #[tokio::test]
        async fn test_load_missing_returns_none() {
            let dir = tempfile::tempdir().unwrap();
            let store = FileSnapshotStore::new(dir.path());

            assert_eq!(store.load(&key("default")).await.unwrap(), None);
        }

        #[tokio::test]
        async fn test_save_then_load() {
            let dir = tempfile::tempdir().unwrap();
            let store = FileSnapshotStore::new(dir.path());
            let key = key("default");

            store.save(&key, "[]").await.unwrap();

            assert_eq!(store.load(&key).await.unwrap().as_deref(), Some("[]"));
            assert!(store.snapshot_path(&key).ends_with("default/laundry_cart.json"));
        }

        #[tokio::test]
        async fn test_later_save_overwrites() {
            let dir = tempfile::tempdir().unwrap();
            let store = FileSnapshotStore::new(dir.path());
            let key = key("default");

            store.save(&key, r#"[{"a":1},{"b":2}]"#).await.unwrap();
            store.save(&key, "[]").await.unwrap();

            assert_eq!(store.load(&key).await.unwrap().as_deref(), Some("[]"));
            assert!(!store.snapshot_path(&key).with_extension("json.tmp").exists());
        }

        #[tokio::test]
        async fn test_origins_are_isolated() {
            let dir = tempfile::tempdir().unwrap();
            let store = FileSnapshotStore::new(dir.path());

            store.save(&key("a"), "[1]").await.unwrap();

            assert_eq!(store.load(&key("b")).await.unwrap(), None);
        }

        #[tokio::test]
        async fn test_unreadable_snapshot_is_an_io_error() {
            let dir = tempfile::tempdir().unwrap();
            let store = FileSnapshotStore::new(dir.path());
            let key = key("default");

            // A directory where the snapshot file should be cannot be read as text
            std::fs::create_dir_all(store.snapshot_path(&key)).unwrap();

            match store.load(&key).await {
                Err(SnapshotError::Io { .. }) => {}
                other => panic!("Expected Io error, got {:?}", other),
            }
        }
    }

    mod memory_store_tests {
        use super::*;

        #[tokio::test]
        async fn test_memory_store_round_trip() {
            let store = InMemorySnapshotStore::new();
            let key = key("default");

            assert!(store.is_empty().await);
            store.save(&key, "[]").await.unwrap();
            assert_eq!(store.len().await, 1);
            assert_eq!(store.load(&key).await.unwrap().as_deref(), Some("[]"));

            store.save(&key, "[1]").await.unwrap();
            assert_eq!(store.len().await, 1);
            assert_eq!(store.load(&key).await.unwrap().as_deref(), Some("[1]"));
            assert_eq!(store.backend(), "memory");
        }
    }

    mod dynamodb_store_tests {
        use super::*;

        #[test]
        fn test_snapshot_to_item_conversion() {
            let store = DynamoDbSnapshotStore::new(
                create_test_client(),
                "test-snapshots".to_string(),
                "us-east-1".to_string(),
            );

            let item = store.snapshot_to_item(&key("shop-1"), "[]");

            assert!(item.contains_key("snapshot_key"));
            assert!(item.contains_key("payload"));
            assert!(item.contains_key("updated_at"));

            if let Some(AttributeValue::S(pk)) = item.get("snapshot_key") {
                assert_eq!(pk, "shop-1#laundry_cart");
            } else {
                panic!("Expected string value for snapshot_key");
            }
            assert_eq!(store.table_name(), "test-snapshots");
            assert_eq!(store.backend(), "dynamodb");
        }

        #[test]
        fn test_item_to_snapshot_round_trip() {
            let store = DynamoDbSnapshotStore::new(
                create_test_client(),
                "test-snapshots".to_string(),
                "us-east-1".to_string(),
            );
            let payload = r#"[{"serviceId":1}]"#;

            let item = store.snapshot_to_item(&key("default"), payload);

            assert_eq!(store.item_to_snapshot(&item).unwrap(), payload);
        }

        #[test]
        fn test_item_without_payload_is_invalid() {
            let store = DynamoDbSnapshotStore::new(
                create_test_client(),
                "test-snapshots".to_string(),
                "us-east-1".to_string(),
            );
            let mut item = HashMap::new();
            item.insert(
                "snapshot_key".to_string(),
                AttributeValue::S("default#laundry_cart".to_string()),
            );

            match store.item_to_snapshot(&item) {
                Err(SnapshotError::InvalidRecord { .. }) => {}
                other => panic!("Expected InvalidRecord error, got {:?}", other),
            }
        }
    }
}
