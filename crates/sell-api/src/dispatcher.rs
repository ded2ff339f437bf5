//! # HTTP Receipt Dispatcher
//!
//! Posts order receipts to a configured forwarding URL. The first attempt
//! runs inline after order creation; failed deliveries are retried
//! out-of-band with doubling backoff. Delivery never affects the committed
//! order or inventory state.

use async_trait::async_trait;
use reqwest::Client;
use sell_core::{Receipt, ReceiptDispatcher, ReconError, ReconResult};
use std::time::Duration;
use tracing::{error, info, warn};

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(2);

/// Receipt dispatcher that forwards receipts as JSON over HTTP
pub struct HttpReceiptDispatcher {
    client: Client,
    url: String,
}

impl HttpReceiptDispatcher {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            url: url.into(),
        }
    }

    async fn post_receipt(client: &Client, url: &str, receipt: &Receipt) -> Result<(), String> {
        let response = client
            .post(url)
            .json(receipt)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(format!("HTTP {status}: {body}"))
        }
    }
}

#[async_trait]
impl ReceiptDispatcher for HttpReceiptDispatcher {
    async fn dispatch(&self, receipt: Receipt) -> ReconResult<()> {
        match Self::post_receipt(&self.client, &self.url, &receipt).await {
            Ok(()) => {
                info!(order_id = %receipt.order_id, "receipt delivered");
                Ok(())
            }
            Err(first_err) => {
                // The order stands regardless; retry out-of-band
                let client = self.client.clone();
                let url = self.url.clone();
                let order_id = receipt.order_id.clone();
                tokio::spawn(async move {
                    let mut delay = RETRY_BASE_DELAY;
                    for attempt in 1..=RETRY_ATTEMPTS {
                        tokio::time::sleep(delay).await;
                        match Self::post_receipt(&client, &url, &receipt).await {
                            Ok(()) => {
                                info!(%order_id, attempt, "receipt delivered on retry");
                                return;
                            }
                            Err(err) => {
                                warn!(%order_id, attempt, %err, "receipt retry failed");
                                delay *= 2;
                            }
                        }
                    }
                    error!(%order_id, "giving up on receipt delivery");
                });

                Err(ReconError::DispatchFailed(first_err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sell_core::{Currency, Order, OrderLine, Price};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn receipt() -> Receipt {
        let order = Order::settled(
            vec![OrderLine {
                item_id: "espresso".to_string(),
                name: "Espresso".to_string(),
                unit_price: Price::from_minor(350, Currency::NGN),
                quantity: 2,
            }],
            Price::from_minor(700, Currency::NGN),
            "Ada",
            "ada@example.com",
            "ref_r",
        );
        Receipt::for_order(&order)
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/receipts"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = HttpReceiptDispatcher::new(format!("{}/receipts", server.uri()));
        dispatcher.dispatch(receipt()).await.unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_reported_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/receipts"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dispatcher = HttpReceiptDispatcher::new(format!("{}/receipts", server.uri()));
        let err = dispatcher.dispatch(receipt()).await.unwrap_err();
        assert!(matches!(err, ReconError::DispatchFailed(_)));
        // Dispatch failures are never retryable at the webhook boundary
        assert!(!err.is_retryable());
    }
}
