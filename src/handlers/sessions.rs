use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::cart_error_to_response;
use crate::models::CartView;
use crate::services::SessionRegistry;

/// Request body for starting a session
#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    #[serde(default)]
    pub origin: Option<String>,
}

/// A freshly started session together with its restored cart
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub origin: String,
    pub started_at: DateTime<Utc>,
    pub cart: CartView,
}

/// Create session router
pub fn create_session_router(registry: Arc<SessionRegistry>) -> Router {
    Router::new()
        .route("/api/sessions", post(start_session))
        .route("/api/sessions/:session_id", delete(end_session))
        .with_state(registry)
}

/// Start a session, restoring the cart stored for its origin
#[instrument(skip(registry, request))]
pub async fn start_session(
    State(registry): State<Arc<SessionRegistry>>,
    request: Option<Json<StartSessionRequest>>,
) -> Result<(StatusCode, Json<SessionResponse>), (StatusCode, Json<Value>)> {
    let origin = request.and_then(|Json(request)| request.origin);

    match registry.start_session(origin.as_deref()).await {
        Ok(session) => {
            let cart = session.handle().view().await;
            info!(
                "Started session {} with {} restored items",
                session.id(),
                cart.items.len()
            );
            Ok((
                StatusCode::CREATED,
                Json(SessionResponse {
                    session_id: session.id(),
                    origin: session.origin().to_string(),
                    started_at: session.started_at(),
                    cart,
                }),
            ))
        }
        Err(err) => {
            error!("Failed to start session: {}", err);
            Err(cart_error_to_response(err))
        }
    }
}

/// End a session once its cart has been persisted
#[instrument(skip(registry))]
pub async fn end_session(
    State(registry): State<Arc<SessionRegistry>>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    match registry.end_session(session_id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(err) => {
            error!("Failed to end session {}: {}", session_id, err);
            Err(cart_error_to_response(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemorySnapshotStore;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> (Arc<SessionRegistry>, Router) {
        let registry = Arc::new(
            SessionRegistry::new(
                Arc::new(InMemorySnapshotStore::new()),
                "laundry_cart",
                "default",
                None,
            )
            .unwrap(),
        );
        (registry.clone(), create_session_router(registry))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_start_session_without_body_uses_default_origin() {
        let (registry, app) = app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/sessions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["origin"], "default");
        assert_eq!(body["cart"]["itemCount"], 0);
        assert_eq!(registry.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn test_start_session_with_origin() {
        let (_, app) = app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/sessions")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"origin":"shop-7"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["origin"], "shop-7");
    }

    #[tokio::test]
    async fn test_start_session_with_invalid_origin() {
        let (_, app) = app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/sessions")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"origin":"../../etc"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_end_session() {
        let (registry, app) = app();
        let session = registry.start_session(None).await.unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/sessions/{}", session.id()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(registry.active_sessions().await, 0);

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/sessions/{}", session.id()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
