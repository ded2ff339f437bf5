//! # sell-paystack
//!
//! Paystack payment provider for sellpoint-rs.
//!
//! This crate provides:
//!
//! 1. **PaystackProvider** - `PaymentProvider` implementation
//!    - Transaction initialization (hosted checkout page)
//!    - Webhook signature verification (HMAC-SHA512 over raw bytes)
//!    - Webhook event parsing
//!
//! 2. **webhook** helpers for signing/verifying payloads directly
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sell_paystack::PaystackProvider;
//! use sell_core::PaymentProvider;
//!
//! // Create provider from environment
//! let provider = PaystackProvider::from_env()?;
//!
//! // Initiate a checkout session
//! let initiated = provider.initiate_payment(&session).await?;
//! // Redirect the customer to initiated.authorization_url
//!
//! // In the webhook endpoint, with the raw body captured before parsing:
//! provider.verify_signature(&body, &signature)?;
//! let notification = provider.parse_notification(&body)?;
//! ```

pub mod checkout;
pub mod config;
pub mod webhook;

// Re-exports
pub use checkout::PaystackProvider;
pub use config::PaystackConfig;
pub use webhook::{compute_signature, parse_event, verify_signature};
