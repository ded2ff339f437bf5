//! # sell-core
//!
//! Core reconciliation engine for sellpoint-rs.
//!
//! This crate provides:
//! - `PaymentReconciler` for idempotent webhook-to-order settlement
//! - `InventoryLedger` for atomic reserve/release of stock
//! - `IdempotencyStore` for exactly-once processing per provider reference
//! - `PaymentProvider` trait for implementing payment providers
//! - `ReceiptDispatcher` trait for the best-effort receipt side effect
//! - `ReconError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use sell_core::{IdempotencyStore, InventoryLedger, PaymentReconciler, NullDispatcher};
//! use std::sync::Arc;
//!
//! let ledger = Arc::new(InventoryLedger::from_catalog(catalog));
//! let reconciler = PaymentReconciler::new(
//!     provider,
//!     IdempotencyStore::new(),
//!     ledger,
//!     Arc::new(NullDispatcher),
//! );
//!
//! // In the webhook endpoint, with the body captured as raw bytes:
//! let result = reconciler.handle_notification(&body, &signature).await?;
//! ```

pub mod dispatch;
pub mod error;
pub mod idempotency;
pub mod inventory;
pub mod money;
pub mod order;
pub mod provider;
pub mod reconciler;

// Re-exports for convenience
pub use dispatch::{NullDispatcher, Receipt, ReceiptDispatcher, ReceiptLine};
pub use error::{ReconError, ReconResult};
pub use idempotency::{
    Begin, FailureReason, IdempotencyRecord, IdempotencyStore, Outcome, ProcessingGuard,
    ReferenceStatus,
};
pub use inventory::{InventoryCatalog, InventoryLedger, ItemConfig, ItemSnapshot, Reservation};
pub use money::{Currency, Price};
pub use order::{CartLine, CartMetadata, Order, OrderLine, PaymentStatus};
pub use provider::{
    BoxedPaymentProvider, InitiatedPayment, NotificationKind, PaymentNotification,
    PaymentProvider, PaymentSession,
};
pub use reconciler::{OrderStore, PaymentReconciler, ProcessingResult};
