//! # Application State
//!
//! Shared state for the axum application: the reconciler, the inventory
//! ledger, the payment provider, and configuration.

use crate::dispatcher::HttpReceiptDispatcher;
use sell_core::{
    BoxedPaymentProvider, IdempotencyStore, InventoryCatalog, InventoryLedger, NullDispatcher,
    PaymentReconciler, ReceiptDispatcher,
};
use sell_paystack::PaystackProvider;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base URL for callbacks
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Where the provider sends the customer's browser after payment
    /// (a storefront page, outside this service)
    pub callback_url: String,
    /// Receipt sink; receipts are logged only when unset
    pub receipt_webhook_url: Option<String>,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let base_url =
            std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
        let callback_url = std::env::var("CALLBACK_URL")
            .unwrap_or_else(|_| format!("{base_url}/checkout/complete"));

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            base_url,
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            callback_url,
            receipt_webhook_url: std::env::var("RECEIPT_WEBHOOK_URL").ok(),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid socket address")
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The reconciliation engine
    pub reconciler: Arc<PaymentReconciler>,
    /// Payment provider (checkout initiation path)
    pub provider: BoxedPaymentProvider,
    /// Inventory ledger (shared with the reconciler)
    pub ledger: Arc<InventoryLedger>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create an AppState from the environment: Paystack provider,
    /// TOML inventory, HTTP receipt dispatcher when configured.
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let ledger = Arc::new(InventoryLedger::from_catalog(load_inventory_catalog()?));

        let provider: BoxedPaymentProvider = Arc::new(
            PaystackProvider::from_env()
                .map_err(|e| anyhow::anyhow!("Failed to initialize Paystack: {}", e))?,
        );

        let dispatcher: Arc<dyn ReceiptDispatcher> = match &config.receipt_webhook_url {
            Some(url) => Arc::new(HttpReceiptDispatcher::new(url.clone())),
            None => Arc::new(NullDispatcher),
        };

        Ok(Self::with_parts(config, ledger, provider, dispatcher))
    }

    /// Assemble state from explicit parts (tests, custom wiring)
    pub fn with_parts(
        config: AppConfig,
        ledger: Arc<InventoryLedger>,
        provider: BoxedPaymentProvider,
        dispatcher: Arc<dyn ReceiptDispatcher>,
    ) -> Self {
        let reconciler = Arc::new(PaymentReconciler::new(
            provider.clone(),
            IdempotencyStore::new(),
            ledger.clone(),
            dispatcher,
        ));

        Self {
            reconciler,
            provider,
            ledger,
            config,
        }
    }
}

/// Load the inventory catalog from the config file
fn load_inventory_catalog() -> anyhow::Result<InventoryCatalog> {
    let config_paths = [
        "config/inventory.toml",
        "../config/inventory.toml",
        "../../config/inventory.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog = InventoryCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded {} items from {}", catalog.items.len(), path);
            return Ok(catalog);
        }
    }

    // Empty catalog if no config found
    tracing::warn!("No inventory catalog found, starting empty");
    Ok(InventoryCatalog::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_defaults() {
        std::env::remove_var("HOST");
        std::env::remove_var("PORT");
        std::env::remove_var("BASE_URL");
        std::env::remove_var("CALLBACK_URL");

        let config = AppConfig::from_env();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.callback_url, "http://localhost:8080/checkout/complete");
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            environment: "test".to_string(),
            callback_url: "http://localhost:3000/checkout/complete".to_string(),
            receipt_webhook_url: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.to_string(), "0.0.0.0:3000");
    }
}
