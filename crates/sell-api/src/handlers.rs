//! # Request Handlers
//!
//! Axum request handlers for the reconciliation API. The webhook handler
//! captures the body as raw bytes before any parsing so signature
//! verification sees exactly what the provider signed.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sell_core::{
    CartLine, CartMetadata, PaymentSession, Price, ProcessingResult, ReconError, ReferenceStatus,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Create checkout request
#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Cart lines
    #[serde(default)]
    pub items: Vec<CheckoutItem>,
    /// Customer email (receipt destination)
    pub customer_email: String,
    /// Customer display name
    pub customer_name: String,
}

/// Item in checkout request
#[derive(Debug, Deserialize)]
pub struct CheckoutItem {
    /// Catalog item ID
    pub item_id: String,
    /// Quantity
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Create checkout response
#[derive(Debug, Serialize)]
pub struct CreateCheckoutResponse {
    /// Provider reference (echoed back later in the webhook)
    pub reference: String,
    /// Hosted payment page (redirect the customer here)
    pub authorization_url: String,
    /// Provider access code for inline widgets
    pub access_code: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }
}

fn recon_error_to_response(err: ReconError) -> (StatusCode, Json<ErrorResponse>) {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "sellpoint",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Initiate a provider checkout session for a cart.
///
/// Stock is previewed here so the customer is not sent off to pay for an
/// obviously empty shelf; the authoritative reservation happens when the
/// webhook settles.
#[instrument(skip(state, request), fields(items = request.items.len()))]
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<Json<CreateCheckoutResponse>, (StatusCode, Json<ErrorResponse>)> {
    let metadata = CartMetadata {
        customer_name: request.customer_name,
        customer_email: request.customer_email,
        lines: request
            .items
            .iter()
            .map(|item| CartLine {
                item_id: item.item_id.clone(),
                quantity: item.quantity,
            })
            .collect(),
    };

    metadata
        .validate()
        .map_err(recon_error_to_response)?;

    // Server-side total from catalog prices; client-declared prices are
    // never part of the request
    let mut total_minor: i64 = 0;
    let mut currency = None;
    for line in &metadata.lines {
        let snapshot = state.ledger.snapshot(&line.item_id).ok_or_else(|| {
            recon_error_to_response(ReconError::ItemNotFound {
                item_id: line.item_id.clone(),
            })
        })?;

        let available = state.ledger.available(&line.item_id).await.unwrap_or(0);
        if available < line.quantity {
            return Err(recon_error_to_response(ReconError::InsufficientStock {
                item_id: line.item_id.clone(),
                requested: line.quantity,
                available,
            }));
        }

        total_minor += snapshot.unit_price.amount * line.quantity as i64;
        currency = Some(snapshot.unit_price.currency);
    }
    let currency = currency.unwrap_or_default();

    let session = PaymentSession {
        metadata,
        total: Price::from_minor(total_minor, currency),
        callback_url: state.config.callback_url.clone(),
    };

    info!(
        total = %session.total.display(),
        "initiating checkout via {}",
        state.provider.provider_name()
    );

    let initiated = state
        .provider
        .initiate_payment(&session)
        .await
        .map_err(|e| {
            error!("Failed to initiate checkout: {}", e);
            recon_error_to_response(e)
        })?;

    Ok(Json(CreateCheckoutResponse {
        reference: initiated.reference,
        authorization_url: initiated.authorization_url,
        access_code: initiated.access_code,
    }))
}

/// Handle a provider payment notification.
///
/// 200 for every settled terminal outcome (duplicates, ignored events, and
/// recorded failures included) so the provider stops retrying; 401 for a
/// verified-invalid signature; 5xx for transient contention so the
/// provider's retry policy redelivers.
#[instrument(skip(state, headers, body))]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ProcessingResult>, (StatusCode, Json<ErrorResponse>)> {
    let signature = headers
        .get("x-provider-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Missing X-Provider-Signature header", 400)),
            )
        })?;

    let result = state
        .reconciler
        .handle_notification(&body, signature)
        .await
        .map_err(recon_error_to_response)?;

    Ok(Json(result))
}

/// Polling fallback: terminal state for a provider reference, sourced from
/// the idempotency store (the same state the webhook path recorded)
pub async fn payment_status(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<ReferenceStatus>, (StatusCode, Json<ErrorResponse>)> {
    match state.reconciler.status(&reference) {
        ReferenceStatus::Unknown => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                format!("Unknown payment reference: {reference}"),
                404,
            )),
        )),
        status => Ok(Json(status)),
    }
}

/// Catalog item as listed by the API
#[derive(Debug, Serialize)]
struct ItemView {
    id: String,
    name: String,
    unit_price: Price,
    available: u32,
}

/// List catalog items with availability
pub async fn list_items(State(state): State<AppState>) -> impl IntoResponse {
    let mut items = Vec::new();
    for snapshot in state.ledger.snapshots() {
        let available = state.ledger.available(&snapshot.id).await.unwrap_or(0);
        items.push(ItemView {
            id: snapshot.id,
            name: snapshot.name,
            unit_price: snapshot.unit_price,
            available,
        });
    }
    let count = items.len();
    Json(serde_json::json!({
        "items": items,
        "count": count
    }))
}

/// Get a single catalog item
pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let snapshot = state.ledger.snapshot(&item_id).ok_or_else(|| {
        recon_error_to_response(ReconError::ItemNotFound {
            item_id: item_id.clone(),
        })
    })?;
    let available = state.ledger.available(&item_id).await.unwrap_or(0);

    Ok(Json(ItemView {
        id: snapshot.id,
        name: snapshot.name,
        unit_price: snapshot.unit_price,
        available,
    }))
}
