//! # Sellpoint RS
//!
//! Webhook-driven payment reconciliation server.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export PAYSTACK_SECRET_KEY=sk_test_...
//! export RECEIPT_WEBHOOK_URL=https://example.com/receipts   # optional
//!
//! # Run the server
//! sellpoint
//! ```

use sell_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr();
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Items loaded: {}", state.ledger.snapshots().len());
    info!("Payment provider: {}", state.provider.provider_name());

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("Sellpoint starting on http://{}", addr);

    if !is_prod {
        info!("Checkout: POST http://{}/api/v1/checkout", addr);
        info!("Webhook:  POST http://{}/payments/webhook", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
