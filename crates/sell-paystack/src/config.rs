//! # Paystack Configuration
//!
//! Configuration management for the Paystack integration.
//! All secrets are loaded from environment variables.

use sell_core::ReconError;
use std::env;

/// Paystack API configuration
#[derive(Debug, Clone)]
pub struct PaystackConfig {
    /// Secret API key (sk_test_... or sk_live_...).
    /// Paystack signs webhooks with this same key.
    pub secret_key: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,
}

impl PaystackConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `PAYSTACK_SECRET_KEY`
    pub fn from_env() -> Result<Self, ReconError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let secret_key = env::var("PAYSTACK_SECRET_KEY").map_err(|_| {
            ReconError::Configuration("PAYSTACK_SECRET_KEY not set".to_string())
        })?;

        if !secret_key.starts_with("sk_test_") && !secret_key.starts_with("sk_live_") {
            return Err(ReconError::Configuration(
                "PAYSTACK_SECRET_KEY must start with sk_test_ or sk_live_".to_string(),
            ));
        }

        Ok(Self {
            secret_key,
            api_base_url: "https://api.paystack.co".to_string(),
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_base_url: "https://api.paystack.co".to_string(),
        }
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_")
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_modes() {
        let config = PaystackConfig::new("sk_test_abc123");
        assert!(config.is_test_mode());

        let config = PaystackConfig::new("sk_live_abc123");
        assert!(!config.is_test_mode());
    }

    #[test]
    fn test_auth_header() {
        let config = PaystackConfig::new("sk_test_abc123");
        assert_eq!(config.auth_header(), "Bearer sk_test_abc123");
    }

    #[test]
    fn test_api_base_override() {
        let config = PaystackConfig::new("sk_test_abc123").with_api_base_url("http://localhost:9");
        assert_eq!(config.api_base_url, "http://localhost:9");
    }
}
