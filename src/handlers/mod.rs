pub mod cart;
pub mod health;
pub mod metrics;
pub mod sessions;

pub use cart::*;
pub use health::*;
pub use metrics::*;
pub use sessions::*;

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::observability::{observability_middleware, Metrics};
use crate::services::SessionRegistry;

/// Build the application router
pub fn create_app(
    registry: Arc<SessionRegistry>,
    metrics: Arc<Metrics>,
    request_timeout: Duration,
) -> Router {
    let metrics_for_middleware = metrics.clone();

    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
        .route("/health/status", get(health_check))
        .with_state(registry.clone())
        .merge(create_session_router(registry.clone()))
        .merge(create_cart_router(registry))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}
