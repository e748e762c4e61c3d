use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

use crate::services::SessionRegistry;

/// Health check endpoint handler
#[instrument(name = "health_check", skip(registry))]
pub async fn health_check(
    State(registry): State<Arc<SessionRegistry>>,
) -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "service": "laundry-rs",
        "version": env!("CARGO_PKG_VERSION"),
        "storage": registry.backend(),
        "activeSessions": registry.active_sessions().await,
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemorySnapshotStore;

    #[tokio::test]
    async fn test_health_check_reports_storage() {
        let registry = Arc::new(
            SessionRegistry::new(
                Arc::new(InMemorySnapshotStore::new()),
                "laundry_cart",
                "default",
                None,
            )
            .unwrap(),
        );
        registry.start_session(None).await.unwrap();

        let Json(body) = health_check(State(registry)).await.unwrap();

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["storage"], "memory");
        assert_eq!(body["activeSessions"], 1);
    }
}
