use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::{CartError, CartView, ServiceListing};
use crate::services::{CartHandle, SessionRegistry};

/// Header carrying the session a cart request belongs to
pub const SESSION_HEADER: &str = "x-session-id";

/// Request body for quantity updates
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// Response for cart summary operations
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummaryResponse {
    pub item_count: u64,
    pub total_amount: Decimal,
    pub is_empty: bool,
}

type HandlerError = (StatusCode, Json<Value>);

/// Create cart router with all endpoints
pub fn create_cart_router(registry: Arc<SessionRegistry>) -> Router {
    Router::new()
        .route("/api/cart", get(get_cart))
        .route("/api/cart/summary", get(get_cart_summary))
        .route("/api/cart/items", post(add_cart_item))
        .route(
            "/api/cart/items/:index",
            put(update_cart_item).delete(remove_cart_item),
        )
        .route("/api/cart/clear", post(clear_cart))
        .route_layer(middleware::from_fn_with_state(registry, session_middleware))
}

/// Bind the session named by the `x-session-id` header for the rest of the request.
///
/// Requests without the header pass through unscoped.
pub async fn session_middleware(
    State(registry): State<Arc<SessionRegistry>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(raw) = request.headers().get(SESSION_HEADER) else {
        return next.run(request).await;
    };

    let session_id = match raw.to_str().ok().and_then(|v| Uuid::parse_str(v.trim()).ok()) {
        Some(session_id) => session_id,
        None => {
            warn!("Rejecting request with malformed {} header", SESSION_HEADER);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "invalid_session_id",
                    "message": format!("{} must be a UUID", SESSION_HEADER),
                })),
            )
                .into_response();
        }
    };

    match registry.session(session_id).await {
        Ok(session) => session.scope(next.run(request)).await,
        Err(err) => {
            warn!("Rejecting cart request: {}", err);
            cart_error_to_response(err).into_response()
        }
    }
}

/// Get the current cart
#[instrument]
pub async fn get_cart() -> Result<Json<CartView>, HandlerError> {
    let cart = current_cart()?;
    Ok(Json(cart.view().await))
}

/// Get item count and total without the line items
#[instrument]
pub async fn get_cart_summary() -> Result<Json<CartSummaryResponse>, HandlerError> {
    let cart = current_cart()?;
    let view = cart.view().await;

    Ok(Json(CartSummaryResponse {
        item_count: view.item_count,
        total_amount: view.total_amount,
        is_empty: view.items.is_empty(),
    }))
}

/// Add a catalog listing to the cart
#[instrument(skip(listing))]
pub async fn add_cart_item(
    Json(listing): Json<ServiceListing>,
) -> Result<Json<CartView>, HandlerError> {
    let cart = current_cart()?;

    match cart.add_listing(listing).await {
        Ok(view) => {
            info!(
                session_id = %cart.session_id(),
                items = view.items.len(),
                "Added item to cart"
            );
            Ok(Json(view))
        }
        Err(err) => {
            warn!("Rejected cart item: {}", err);
            Err(cart_error_to_response(err))
        }
    }
}

/// Set the quantity of the line at `index`
#[instrument(skip(request))]
pub async fn update_cart_item(
    Path(index): Path<usize>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<Json<CartView>, HandlerError> {
    let cart = current_cart()?;
    Ok(Json(cart.update_quantity(index, request.quantity).await))
}

/// Remove the line at `index`
#[instrument]
pub async fn remove_cart_item(Path(index): Path<usize>) -> Result<Json<CartView>, HandlerError> {
    let cart = current_cart()?;
    Ok(Json(cart.remove_item(index).await))
}

/// Remove every line
#[instrument]
pub async fn clear_cart() -> Result<Json<CartView>, HandlerError> {
    let cart = current_cart()?;
    let view = cart.clear().await;
    info!(session_id = %cart.session_id(), "Cart cleared");
    Ok(Json(view))
}

fn current_cart() -> Result<CartHandle, HandlerError> {
    CartHandle::current().map_err(|err| {
        warn!("Cart request without a session: {}", err);
        cart_error_to_response(err)
    })
}

/// Convert a cart error into an HTTP status and JSON body
pub fn cart_error_to_response(err: CartError) -> HandlerError {
    let (status, code) = match &err {
        CartError::NoActiveSession => (StatusCode::BAD_REQUEST, "no_active_session"),
        CartError::SessionNotFound { .. } => (StatusCode::NOT_FOUND, "session_not_found"),
        CartError::ValidationError { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
        CartError::Snapshot { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "snapshot_error"),
    };

    let message = match &err {
        CartError::Snapshot { .. } => "Internal server error".to_string(),
        _ => err.to_string(),
    };

    (
        status,
        Json(json!({
            "error": code,
            "message": message,
        })),
    )
}
