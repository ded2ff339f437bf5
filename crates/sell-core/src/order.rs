//! # Order Types
//!
//! Orders, order lines, and the cart metadata contract that travels through
//! the payment provider and comes back in the webhook.

use crate::error::{ReconError, ReconResult};
use crate::money::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One requested cart line, as submitted at checkout initiation and echoed
/// back in the webhook metadata. Quantities are validated on receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Catalog item ID
    pub item_id: String,

    /// Requested quantity (must be >= 1)
    pub quantity: u32,
}

/// The metadata envelope embedded in the provider checkout session.
///
/// The provider echoes this back verbatim in the webhook's `metadata` field;
/// it is the only channel carrying cart contents through the provider. Item
/// prices are deliberately absent: they are looked up in the catalog at
/// processing time, never trusted from the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartMetadata {
    /// Customer display name
    pub customer_name: String,

    /// Customer email (receipt destination)
    pub customer_email: String,

    /// Cart lines
    pub lines: Vec<CartLine>,
}

impl CartMetadata {
    /// Validate the echoed metadata before any inventory work
    pub fn validate(&self) -> ReconResult<()> {
        if self.customer_name.trim().is_empty() {
            return Err(ReconError::InvalidRequest(
                "Customer name is required".to_string(),
            ));
        }
        if !is_valid_email(&self.customer_email) {
            return Err(ReconError::InvalidRequest(format!(
                "{} is not a valid email address",
                self.customer_email
            )));
        }
        if self.lines.is_empty() {
            return Err(ReconError::InvalidRequest(
                "No items provided for the order".to_string(),
            ));
        }
        if let Some(line) = self.lines.iter().find(|l| l.quantity == 0) {
            return Err(ReconError::InvalidRequest(format!(
                "Quantity must be at least 1 for item {}",
                line.item_id
            )));
        }
        Ok(())
    }
}

/// Minimal email shape check: one `@` with a dotted, non-empty domain.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || email.contains(char::is_whitespace) {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// A line item on a committed order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    /// Catalog item ID
    pub item_id: String,

    /// Item name (denormalized for receipts)
    pub name: String,

    /// Unit price captured at processing time, never recomputed later
    pub unit_price: Price,

    /// Quantity (>= 1)
    pub quantity: u32,
}

impl OrderLine {
    /// Total for this line
    pub fn total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// Payment status of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

/// A committed order. Written exactly once per successful, verified payment;
/// immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID (generated)
    pub id: String,

    /// Ordered lines
    pub lines: Vec<OrderLine>,

    /// Total amount, derived from catalog prices at processing time
    pub total: Price,

    /// Customer name
    pub customer_name: String,

    /// Customer email (validated)
    pub customer_email: String,

    /// Payment status
    pub payment_status: PaymentStatus,

    /// Provider reference this order settles (unique per successful payment)
    pub provider_reference: String,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a successful order with a generated ID
    pub fn settled(
        lines: Vec<OrderLine>,
        total: Price,
        customer_name: impl Into<String>,
        customer_email: impl Into<String>,
        provider_reference: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            lines,
            total,
            customer_name: customer_name.into(),
            customer_email: customer_email.into(),
            payment_status: PaymentStatus::Success,
            provider_reference: provider_reference.into(),
            created_at: Utc::now(),
        }
    }

    /// Total unit count across all lines
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("cashier@sellpoint.io"));
        assert!(is_valid_email("a.b+c@shop.example.com"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("@missing-local.com"));
        assert!(!is_valid_email("spaced name@shop.com"));
        assert!(!is_valid_email("no-tld@shop"));
        assert!(!is_valid_email("short-tld@shop.c"));
    }

    #[test]
    fn test_metadata_validation() {
        let valid = CartMetadata {
            customer_name: "Ada".to_string(),
            customer_email: "ada@example.com".to_string(),
            lines: vec![CartLine {
                item_id: "espresso".to_string(),
                quantity: 2,
            }],
        };
        assert!(valid.validate().is_ok());

        let empty_cart = CartMetadata {
            lines: vec![],
            ..valid.clone()
        };
        assert!(empty_cart.validate().is_err());

        let zero_qty = CartMetadata {
            lines: vec![CartLine {
                item_id: "espresso".to_string(),
                quantity: 0,
            }],
            ..valid.clone()
        };
        assert!(zero_qty.validate().is_err());

        let bad_email = CartMetadata {
            customer_email: "not-an-email".to_string(),
            ..valid
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_order_line_total() {
        let line = OrderLine {
            item_id: "espresso".to_string(),
            name: "Espresso".to_string(),
            unit_price: Price::new(3.50, Currency::NGN),
            quantity: 4,
        };
        assert_eq!(line.total().amount, 1400);
    }

    #[test]
    fn test_settled_order() {
        let line = OrderLine {
            item_id: "espresso".to_string(),
            name: "Espresso".to_string(),
            unit_price: Price::from_minor(350, Currency::NGN),
            quantity: 2,
        };
        let order = Order::settled(
            vec![line],
            Price::from_minor(700, Currency::NGN),
            "Ada",
            "ada@example.com",
            "ref_abc123",
        );

        assert_eq!(order.payment_status, PaymentStatus::Success);
        assert_eq!(order.provider_reference, "ref_abc123");
        assert_eq!(order.item_count(), 2);
    }
}
