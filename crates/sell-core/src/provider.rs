//! # Payment Provider Trait
//!
//! Seam between the reconciliation core and a concrete payment provider
//! (Paystack today). Signature verification is deliberately a separate
//! operation from parsing and takes the raw received bytes: any round-trip
//! through a JSON parser can reorder keys or alter whitespace and silently
//! invalidate a legitimate signature.

use crate::error::ReconResult;
use crate::money::{Currency, Price};
use crate::order::CartMetadata;
use async_trait::async_trait;
use std::sync::Arc;

/// What the provider told us about a payment attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Payment settled successfully
    Success,
    /// Payment failed at the provider
    Failed,
    /// Payment still pending
    Pending,
    /// Event type we do not act on
    Unknown,
}

/// A parsed, signature-verified provider notification
#[derive(Debug, Clone)]
pub struct PaymentNotification {
    /// Provider reference for the payment attempt (the idempotency key)
    pub reference: String,

    /// Raw provider event name (e.g. "charge.success"), kept for audit
    pub event: String,

    /// Classified event kind
    pub kind: NotificationKind,

    /// Amount the provider claims was paid, in smallest currency unit.
    /// Informational only; order totals come from the catalog.
    pub amount: i64,

    /// Settlement currency
    pub currency: Currency,

    /// The cart metadata echoed back from checkout initiation
    pub metadata: Option<CartMetadata>,
}

/// Ephemeral checkout-initiation input; never persisted by the core
#[derive(Debug, Clone)]
pub struct PaymentSession {
    /// Cart + customer envelope to embed in provider metadata
    pub metadata: CartMetadata,

    /// Server-computed total (catalog prices)
    pub total: Price,

    /// Where the provider should send the customer after payment
    pub callback_url: String,
}

/// Provider-side checkout session handle returned to the client
#[derive(Debug, Clone, serde::Serialize)]
pub struct InitiatedPayment {
    /// Provider reference, echoed back later in the webhook
    pub reference: String,

    /// Hosted payment page to redirect the customer to
    pub authorization_url: String,

    /// Provider access code for inline checkout widgets
    pub access_code: String,
}

/// Core trait for payment provider implementations
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a provider-side checkout session for a cart.
    async fn initiate_payment(&self, session: &PaymentSession) -> ReconResult<InitiatedPayment>;

    /// Verify the notification signature over the exact bytes received on
    /// the wire. Malformed headers or bodies are simply invalid.
    fn verify_signature(&self, payload: &[u8], signature: &str) -> ReconResult<()>;

    /// Parse a verified notification body.
    fn parse_notification(&self, payload: &[u8]) -> ReconResult<PaymentNotification>;

    /// Provider name (for logging and routing)
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared payment provider (dynamic dispatch)
pub type BoxedPaymentProvider = Arc<dyn PaymentProvider>;
