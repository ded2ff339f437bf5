//! # Routes
//!
//! Axum router configuration for the reconciliation API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - API:
///   - POST /api/v1/checkout - Initiate a provider checkout session
///   - GET  /api/v1/payments/{reference}/status - Polling fallback
///   - GET  /api/v1/items - List catalog items with availability
///   - GET  /api/v1/items/{item_id} - Get one item
///
/// - Webhooks (no CORS, raw body):
///   - POST /payments/webhook - Provider payment notifications
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/checkout", post(handlers::create_checkout))
        .route(
            "/payments/{reference}/status",
            get(handlers::payment_status),
        )
        .route("/items", get(handlers::list_items))
        .route("/items/{item_id}", get(handlers::get_item));

    // Webhook route stays outside the CORS'd API surface and must see the
    // request body byte-exact
    let webhook_routes = Router::new().route("/webhook", post(handlers::payment_webhook));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes)
        .nest("/payments", webhook_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
