//! # Reconciliation Error Types
//!
//! Typed error handling for the sellpoint reconciliation engine.
//! All reconciliation operations return `Result<T, ReconError>`.

use thiserror::Error;

/// Core error type for all reconciliation operations
#[derive(Debug, Error)]
pub enum ReconError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Item not found in the inventory catalog
    #[error("Item not found: {item_id}")]
    ItemNotFound { item_id: String },

    /// Not enough stock to cover a reservation
    #[error("Insufficient stock for {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: String,
        requested: u32,
        available: u32,
    },

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    SignatureInvalid(String),

    /// Webhook payload parsing error (after a valid signature)
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// Could not acquire an inventory or idempotency lock within the bounded
    /// window; the provider is expected to redeliver
    #[error("Lock acquisition timed out on {resource}")]
    LockTimeout { resource: String },

    /// Idempotency or order storage is unavailable
    #[error("Transient store failure: {0}")]
    TransientStoreFailure(String),

    /// Two different outcomes recorded for one provider reference
    #[error("Idempotency conflict for reference {reference}: {message}")]
    IdempotencyConflict { reference: String, message: String },

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with the provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Receipt dispatch failed (never escalated to an order-level failure)
    #[error("Receipt dispatch failed: {0}")]
    DispatchFailed(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReconError {
    /// Returns true if the provider should redeliver this notification.
    ///
    /// Retryable errors must never consume the idempotency key for the
    /// reference being processed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReconError::LockTimeout { .. }
                | ReconError::TransientStoreFailure(_)
                | ReconError::NetworkError(_)
                | ReconError::ProviderError { .. }
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ReconError::Configuration(_) => 500,
            ReconError::InvalidRequest(_) => 400,
            ReconError::ItemNotFound { .. } => 404,
            ReconError::InsufficientStock { .. } => 409,
            ReconError::SignatureInvalid(_) => 401,
            ReconError::WebhookParseError(_) => 400,
            ReconError::LockTimeout { .. } => 503,
            ReconError::TransientStoreFailure(_) => 503,
            ReconError::IdempotencyConflict { .. } => 500,
            ReconError::ProviderError { .. } => 502,
            ReconError::NetworkError(_) => 503,
            ReconError::DispatchFailed(_) => 500,
            ReconError::Serialization(_) => 500,
            ReconError::Internal(_) => 500,
        }
    }
}

/// Result type alias for reconciliation operations
pub type ReconResult<T> = Result<T, ReconError>;
