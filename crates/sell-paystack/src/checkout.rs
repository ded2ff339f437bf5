//! # Paystack Transaction Initialization
//!
//! Implementation of Paystack's `/transaction/initialize` API and the
//! [`PaymentProvider`] seam. The cart metadata envelope embedded here is
//! echoed back verbatim in the later webhook and is the reconciler's only
//! channel for cart contents.

use crate::config::PaystackConfig;
use crate::webhook;
use async_trait::async_trait;
use reqwest::Client;
use sell_core::{
    InitiatedPayment, PaymentNotification, PaymentProvider, PaymentSession, ReconError,
    ReconResult,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

/// Paystack payment provider
pub struct PaystackProvider {
    config: PaystackConfig,
    client: Client,
}

impl PaystackProvider {
    /// Create a new Paystack provider
    pub fn new(config: PaystackConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Create from environment variables
    pub fn from_env() -> ReconResult<Self> {
        let config = PaystackConfig::from_env()?;
        Ok(Self::new(config))
    }
}

#[async_trait]
impl PaymentProvider for PaystackProvider {
    #[instrument(skip(self, session), fields(email = %session.metadata.customer_email))]
    async fn initiate_payment(&self, session: &PaymentSession) -> ReconResult<InitiatedPayment> {
        let request = InitializeRequest {
            email: session.metadata.customer_email.clone(),
            amount: session.total.amount,
            currency: session.total.currency.as_str().to_string(),
            metadata: &session.metadata,
            callback_url: session.callback_url.clone(),
        };

        debug!(
            amount = request.amount,
            currency = %request.currency,
            "initializing Paystack transaction"
        );

        let url = format!("{}/transaction/initialize", self.config.api_base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .json(&request)
            .send()
            .await
            .map_err(|e| ReconError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ReconError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Paystack API error: status={}, body={}", status, body);

            if let Ok(err_response) = serde_json::from_str::<InitializeResponse>(&body) {
                return Err(ReconError::ProviderError {
                    provider: "paystack".to_string(),
                    message: err_response.message,
                });
            }

            return Err(ReconError::ProviderError {
                provider: "paystack".to_string(),
                message: format!("HTTP {status}: {body}"),
            });
        }

        let parsed: InitializeResponse = serde_json::from_str(&body).map_err(|e| {
            ReconError::Serialization(format!("Failed to parse Paystack response: {e}"))
        })?;

        if !parsed.status {
            return Err(ReconError::ProviderError {
                provider: "paystack".to_string(),
                message: parsed.message,
            });
        }

        let data = parsed.data.ok_or_else(|| {
            ReconError::ProviderError {
                provider: "paystack".to_string(),
                message: "initialize response carried no data".to_string(),
            }
        })?;

        info!(reference = %data.reference, "created Paystack checkout session");

        Ok(InitiatedPayment {
            reference: data.reference,
            authorization_url: data.authorization_url,
            access_code: data.access_code,
        })
    }

    fn verify_signature(&self, payload: &[u8], signature: &str) -> ReconResult<()> {
        if webhook::verify_signature(&self.config.secret_key, payload, signature) {
            Ok(())
        } else {
            Err(ReconError::SignatureInvalid(
                "signature does not match payload".to_string(),
            ))
        }
    }

    fn parse_notification(&self, payload: &[u8]) -> ReconResult<PaymentNotification> {
        webhook::parse_event(payload)
    }

    fn provider_name(&self) -> &'static str {
        "paystack"
    }
}

// =============================================================================
// Paystack API Types
// =============================================================================

#[derive(Debug, Serialize)]
struct InitializeRequest<'a> {
    email: String,
    amount: i64,
    currency: String,
    metadata: &'a sell_core::CartMetadata,
    callback_url: String,
}

#[derive(Debug, Deserialize)]
struct InitializeResponse {
    status: bool,
    message: String,
    #[serde(default)]
    data: Option<InitializeData>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: String,
    reference: String,
}
