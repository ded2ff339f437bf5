//! # Money Types
//!
//! Currencies and fixed-point prices for the reconciliation engine.
//! Amounts are always carried in the smallest currency unit (kobo, cents)
//! so order totals never touch floating point.

use serde::{Deserialize, Serialize};

/// Supported settlement currencies (the Paystack set, ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    NGN,
    GHS,
    ZAR,
    USD,
    KES,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::NGN => "NGN",
            Currency::GHS => "GHS",
            Currency::ZAR => "ZAR",
            Currency::USD => "USD",
            Currency::KES => "KES",
        }
    }

    /// Parse a provider-supplied currency code (case-insensitive)
    pub fn parse(code: &str) -> Option<Self> {
        match code.to_uppercase().as_str() {
            "NGN" => Some(Currency::NGN),
            "GHS" => Some(Currency::GHS),
            "ZAR" => Some(Currency::ZAR),
            "USD" => Some(Currency::USD),
            "KES" => Some(Currency::KES),
            _ => None,
        }
    }

    /// Convert a decimal amount to the smallest currency unit
    pub fn to_smallest_unit(&self, amount: f64) -> i64 {
        (amount * 100.0).round() as i64
    }

    /// Convert from smallest unit back to decimal
    pub fn from_smallest_unit(&self, amount: i64) -> f64 {
        amount as f64 / 100.0
    }

    /// Currency symbol for receipts
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::NGN => "₦",
            Currency::GHS => "₵",
            Currency::ZAR => "R",
            Currency::USD => "$",
            Currency::KES => "KSh",
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::NGN
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Price with amount in smallest currency unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in smallest currency unit (kobo for NGN)
    pub amount: i64,
    /// Currency
    pub currency: Currency,
}

impl Price {
    /// Create a new price from a decimal amount
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self {
            amount: currency.to_smallest_unit(amount),
            currency,
        }
    }

    /// Create a price directly from the smallest unit
    pub fn from_minor(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Get the decimal amount
    pub fn as_decimal(&self) -> f64 {
        self.currency.from_smallest_unit(self.amount)
    }

    /// Multiply by a quantity
    pub fn times(&self, quantity: u32) -> Price {
        Price {
            amount: self.amount * quantity as i64,
            currency: self.currency,
        }
    }

    /// Format for display (e.g., "₦10.00")
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency.symbol(), self.as_decimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_conversion() {
        let ngn = Currency::NGN;
        assert_eq!(ngn.to_smallest_unit(10.99), 1099);
        assert_eq!(ngn.from_smallest_unit(1099), 10.99);
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!(Currency::parse("ngn"), Some(Currency::NGN));
        assert_eq!(Currency::parse("USD"), Some(Currency::USD));
        assert_eq!(Currency::parse("btc"), None);
    }

    #[test]
    fn test_price_times() {
        let price = Price::new(7.00, Currency::NGN);
        assert_eq!(price.times(3).amount, 2100);
    }

    #[test]
    fn test_price_display() {
        let price = Price::new(29.99, Currency::NGN);
        assert_eq!(price.display(), "₦29.99");
    }
}
