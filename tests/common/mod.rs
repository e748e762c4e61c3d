#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use laundry_rs::{
    create_app,
    observability::Metrics,
    repositories::{FileSnapshotStore, SnapshotStore},
    SessionRegistry,
};

pub const SESSION_HEADER: &str = "x-session-id";

/// A full application backed by snapshot files in a temporary directory
pub struct TestEnvironment {
    pub app: Router,
    pub registry: Arc<SessionRegistry>,
    pub store: Arc<FileSnapshotStore>,
    pub metrics: Arc<Metrics>,
    _data_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let data_dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileSnapshotStore::new(data_dir.path()));
        Self::with_store(store, data_dir)
    }

    /// A second application sharing this one's snapshot directory
    pub fn restart(&self) -> (Router, Arc<SessionRegistry>) {
        let store: Arc<dyn SnapshotStore> = Arc::new(FileSnapshotStore::new(self.store.root()));
        let registry =
            Arc::new(SessionRegistry::new(store, "laundry_cart", "default", None).unwrap());
        let app = create_app(
            registry.clone(),
            Arc::new(Metrics::new().unwrap()),
            Duration::from_secs(5),
        );
        (app, registry)
    }

    fn with_store(store: Arc<FileSnapshotStore>, data_dir: TempDir) -> Self {
        let metrics = Arc::new(Metrics::new().unwrap());
        let registry = Arc::new(
            SessionRegistry::new(
                store.clone(),
                "laundry_cart",
                "default",
                Some(metrics.clone()),
            )
            .unwrap(),
        );
        let app = create_app(registry.clone(), metrics.clone(), Duration::from_secs(5));

        Self {
            app,
            registry,
            store,
            metrics,
            _data_dir: data_dir,
        }
    }
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    session_id: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(session_id) = session_id {
        builder = builder.header(SESSION_HEADER, session_id);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.clone().oneshot(request).await.unwrap()
}

pub async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Start a session on `origin` through the API and return its id
pub async fn start_session(app: &Router, origin: &str) -> String {
    let response = send(
        app,
        "POST",
        "/api/sessions",
        None,
        Some(serde_json::json!({ "origin": origin })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await["sessionId"]
        .as_str()
        .unwrap()
        .to_string()
}
