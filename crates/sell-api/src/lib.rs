//! # sell-api
//!
//! HTTP API layer for sellpoint-rs.
//!
//! Wires the reconciliation engine (`sell-core`) and the Paystack provider
//! (`sell-paystack`) into an axum application:
//!
//! - `POST /api/v1/checkout` - checkout initiation
//! - `POST /payments/webhook` - provider notifications (raw body)
//! - `GET /api/v1/payments/{reference}/status` - polling fallback
//! - `GET /api/v1/items` - catalog with availability

pub mod dispatcher;
pub mod handlers;
pub mod routes;
pub mod state;

pub use dispatcher::HttpReceiptDispatcher;
pub use routes::create_router;
pub use state::{AppConfig, AppState};
