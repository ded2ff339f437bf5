//! # Receipt Dispatch
//!
//! Best-effort delivery of an order receipt after the authoritative order
//! and inventory state has committed. Dispatch failure is logged and
//! retried by the implementation, never propagated into the order outcome.

use crate::error::ReconResult;
use crate::money::Price;
use crate::order::Order;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// One receipt line, pre-formatted for the customer
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: u32,
    pub line_total: String,
}

/// The receipt handed to a dispatcher after order creation
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub order_id: String,
    pub provider_reference: String,
    pub customer_name: String,
    pub customer_email: String,
    pub lines: Vec<ReceiptLine>,
    pub total: String,
}

impl Receipt {
    /// Build a receipt from a committed order
    pub fn for_order(order: &Order) -> Self {
        let lines = order
            .lines
            .iter()
            .map(|line| ReceiptLine {
                name: line.name.clone(),
                quantity: line.quantity,
                line_total: Price::from_minor(
                    line.unit_price.amount * line.quantity as i64,
                    line.unit_price.currency,
                )
                .display(),
            })
            .collect();

        Self {
            order_id: order.id.clone(),
            provider_reference: order.provider_reference.clone(),
            customer_name: order.customer_name.clone(),
            customer_email: order.customer_email.clone(),
            lines,
            total: order.total.display(),
        }
    }
}

/// Receipt delivery seam.
///
/// Implementations own their retry policy; they must be idempotent (a
/// receipt may be sent more than once) and must never touch inventory or
/// order state.
#[async_trait]
pub trait ReceiptDispatcher: Send + Sync {
    /// Deliver a receipt. Called at most once synchronously per order
    /// creation; out-of-band retries belong to the implementation.
    async fn dispatch(&self, receipt: Receipt) -> ReconResult<()>;
}

/// Dispatcher that only logs (tests, or deployments with no receipt sink)
pub struct NullDispatcher;

#[async_trait]
impl ReceiptDispatcher for NullDispatcher {
    async fn dispatch(&self, receipt: Receipt) -> ReconResult<()> {
        info!(
            order_id = %receipt.order_id,
            email = %receipt.customer_email,
            total = %receipt.total,
            "receipt dispatch (null sink)"
        );
        Ok(())
    }
}
