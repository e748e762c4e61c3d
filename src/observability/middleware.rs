use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::{sync::Arc, time::Instant};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::Metrics;
use crate::handlers::SESSION_HEADER;

/// Routes polled by orchestrators and scrapers; logged at debug only
const PROBE_ROUTES: [&str; 2] = ["/health/status", "/metrics"];

/// Middleware for request tracing and HTTP metrics collection
#[instrument(skip_all, fields(
    request_id = %Uuid::new_v4(),
    method = %request.method(),
    uri = %request.uri(),
    session_id = %request
        .headers()
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-"),
))]
pub async fn observability_middleware(
    metrics: Arc<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();

    // Route templates keep session ids and line indices out of the labels
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    let elapsed = started.elapsed();
    let status = response.status();
    metrics.record_http_request(&method, &endpoint, status.as_u16(), elapsed.as_secs_f64());

    let duration_ms = elapsed.as_millis();
    if status.is_server_error() {
        warn!(status = status.as_u16(), endpoint = %endpoint, duration_ms, "Request failed");
    } else if PROBE_ROUTES.contains(&endpoint.as_str()) {
        debug!(status = status.as_u16(), endpoint = %endpoint, duration_ms, "Probe served");
    } else {
        info!(status = status.as_u16(), endpoint = %endpoint, duration_ms, "Request completed");
    }

    response
}
