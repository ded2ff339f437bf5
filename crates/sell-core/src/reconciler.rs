//! # Payment Reconciler
//!
//! Orchestrates webhook processing: verify signature, consult the
//! idempotency store, reserve inventory, create the order, record the
//! outcome, then hand the receipt to the dispatcher.
//!
//! Per provider reference the state machine settles exactly one terminal
//! state; duplicate deliveries observe that state instead of reprocessing.
//! Transient failures (lock timeouts) release the idempotency reservation
//! so the provider's own retry can succeed once contention clears.

use crate::dispatch::{Receipt, ReceiptDispatcher};
use crate::error::{ReconError, ReconResult};
use crate::idempotency::{
    Begin, FailureReason, IdempotencyRecord, IdempotencyStore, Outcome, ReferenceStatus,
};
use crate::inventory::InventoryLedger;
use crate::money::Price;
use crate::order::{Order, OrderLine};
use crate::provider::{BoxedPaymentProvider, NotificationKind, PaymentNotification};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{info, instrument, warn};

/// Write-once order storage
#[derive(Clone, Default)]
pub struct OrderStore {
    inner: Arc<RwLock<HashMap<String, Order>>>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, order: Order) {
        self.inner
            .write()
            .expect("order store lock poisoned")
            .insert(order.id.clone(), order);
    }

    pub fn get(&self, order_id: &str) -> Option<Order> {
        self.inner
            .read()
            .expect("order store lock poisoned")
            .get(order_id)
            .cloned()
    }

    pub fn by_reference(&self, reference: &str) -> Option<Order> {
        self.inner
            .read()
            .expect("order store lock poisoned")
            .values()
            .find(|o| o.provider_reference == reference)
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.inner.read().expect("order store lock poisoned").len()
    }
}

/// Terminal result of handling one notification delivery
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum ProcessingResult {
    /// This delivery settled the reference
    Processed { record: IdempotencyRecord },
    /// The reference had already settled; the stored outcome is replayed
    Duplicate { record: IdempotencyRecord },
}

impl ProcessingResult {
    pub fn record(&self) -> &IdempotencyRecord {
        match self {
            ProcessingResult::Processed { record } => record,
            ProcessingResult::Duplicate { record } => record,
        }
    }
}

/// The reconciliation engine
pub struct PaymentReconciler {
    provider: BoxedPaymentProvider,
    idempotency: IdempotencyStore,
    ledger: Arc<InventoryLedger>,
    orders: OrderStore,
    dispatcher: Arc<dyn ReceiptDispatcher>,
}

impl PaymentReconciler {
    pub fn new(
        provider: BoxedPaymentProvider,
        idempotency: IdempotencyStore,
        ledger: Arc<InventoryLedger>,
        dispatcher: Arc<dyn ReceiptDispatcher>,
    ) -> Self {
        Self {
            provider,
            idempotency,
            ledger,
            orders: OrderStore::new(),
            dispatcher,
        }
    }

    pub fn orders(&self) -> &OrderStore {
        &self.orders
    }

    pub fn ledger(&self) -> &Arc<InventoryLedger> {
        &self.ledger
    }

    /// Current terminal (or in-flight) state for a reference, as the
    /// polling fallback endpoint reports it.
    pub fn status(&self, reference: &str) -> ReferenceStatus {
        self.idempotency.status(reference)
    }

    /// Process one inbound provider notification.
    ///
    /// Safe to call repeatedly with the same physical delivery: at most one
    /// order and one inventory deduction ever result for one reference.
    #[instrument(skip(self, raw_body, signature), fields(provider = self.provider.provider_name()))]
    pub async fn handle_notification(
        &self,
        raw_body: &[u8],
        signature: &str,
    ) -> ReconResult<ProcessingResult> {
        // Verification runs over the exact received bytes, before parsing
        if let Err(err) = self.provider.verify_signature(raw_body, signature) {
            warn!(%err, "rejected webhook with invalid signature");
            return Err(err);
        }

        let notification = self.provider.parse_notification(raw_body)?;
        let reference = notification.reference.clone();

        let guard = match self.idempotency.begin(&reference).await? {
            Begin::Replay(record) => {
                info!(%reference, "duplicate delivery, replaying stored outcome");
                return Ok(ProcessingResult::Duplicate { record });
            }
            Begin::Fresh(guard) => guard,
        };

        if notification.kind != NotificationKind::Success {
            info!(%reference, event = %notification.event, "non-success event recorded for audit");
            let record = guard.complete(Outcome::Ignored {
                event: notification.event,
            })?;
            return Ok(ProcessingResult::Processed { record });
        }

        match self.settle_success(&notification).await {
            Ok(order) => {
                let record = guard.complete(Outcome::OrderCreated {
                    order_id: order.id.clone(),
                })?;
                info!(%reference, order_id = %order.id, total = %order.total.display(), "order created");

                // Side effect runs only after the authoritative commit;
                // its failure never reverses the order
                let receipt = Receipt::for_order(&order);
                if let Err(err) = self.dispatcher.dispatch(receipt).await {
                    warn!(%reference, order_id = %order.id, %err, "receipt dispatch failed, order stands");
                }

                Ok(ProcessingResult::Processed { record })
            }
            Err(err) if err.is_retryable() => {
                // Guard drops here, releasing the idempotency key
                warn!(%reference, %err, "transient failure, provider should redeliver");
                Err(err)
            }
            Err(err) => match failure_reason(&err) {
                Some(reason) => {
                    warn!(%reference, %err, "reservation failed, recording failure outcome");
                    let record = guard.complete(Outcome::Failed { reason })?;
                    Ok(ProcessingResult::Processed { record })
                }
                // Programming/invariant errors halt this request
                None => Err(err),
            },
        }
    }

    /// Validate, reserve, and commit one successful payment into an order.
    async fn settle_success(&self, notification: &PaymentNotification) -> ReconResult<Order> {
        let metadata = notification.metadata.as_ref().ok_or_else(|| {
            ReconError::InvalidRequest("notification carries no cart metadata".to_string())
        })?;
        metadata.validate()?;

        // Capture catalog prices before reserving; prices on the wire are
        // never trusted
        let mut lines = Vec::with_capacity(metadata.lines.len());
        let mut total_minor: i64 = 0;
        let mut currency = notification.currency;

        for cart_line in &metadata.lines {
            let snapshot = self.ledger.snapshot(&cart_line.item_id).ok_or_else(|| {
                ReconError::ItemNotFound {
                    item_id: cart_line.item_id.clone(),
                }
            })?;
            total_minor += snapshot.unit_price.amount * cart_line.quantity as i64;
            currency = snapshot.unit_price.currency;
            lines.push(OrderLine {
                item_id: snapshot.id,
                name: snapshot.name,
                unit_price: snapshot.unit_price,
                quantity: cart_line.quantity,
            });
        }

        let total = Price::from_minor(total_minor, currency);
        if notification.amount != total.amount {
            warn!(
                reference = %notification.reference,
                declared = notification.amount,
                catalog = total.amount,
                "declared amount diverges from catalog total, catalog wins"
            );
        }

        // Atomic all-or-nothing deduction; the reservation stands once the
        // order commits
        let _reservation = self.ledger.reserve(&metadata.lines).await?;

        let order = Order::settled(
            lines,
            total,
            &metadata.customer_name,
            &metadata.customer_email,
            &notification.reference,
        );
        self.orders.insert(order.clone());

        Ok(order)
    }
}

/// Map an order-level validation error to a recordable failure outcome.
/// Returns `None` for errors that must halt processing instead.
fn failure_reason(err: &ReconError) -> Option<FailureReason> {
    match err {
        ReconError::ItemNotFound { item_id } => Some(FailureReason::ItemNotFound {
            item_id: item_id.clone(),
        }),
        ReconError::InsufficientStock {
            item_id,
            requested,
            available,
        } => Some(FailureReason::InsufficientStock {
            item_id: item_id.clone(),
            requested: *requested,
            available: *available,
        }),
        ReconError::InvalidRequest(message) | ReconError::WebhookParseError(message) => {
            Some(FailureReason::InvalidMetadata {
                message: message.clone(),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::NullDispatcher;
    use crate::inventory::ItemConfig;
    use crate::money::Currency;
    use crate::order::{CartLine, CartMetadata};
    use crate::provider::{InitiatedPayment, PaymentProvider, PaymentSession};
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;

    const GOOD_SIGNATURE: &str = "test-signature";

    /// Provider stub: fixed signature check, JSON body parsing
    struct StubProvider;

    #[derive(Deserialize)]
    struct StubEvent {
        event: String,
        reference: String,
        amount: i64,
        currency: String,
        metadata: Option<CartMetadata>,
    }

    #[async_trait]
    impl PaymentProvider for StubProvider {
        async fn initiate_payment(
            &self,
            _session: &PaymentSession,
        ) -> ReconResult<InitiatedPayment> {
            Err(ReconError::Internal("not used in these tests".to_string()))
        }

        fn verify_signature(&self, _payload: &[u8], signature: &str) -> ReconResult<()> {
            if signature == GOOD_SIGNATURE {
                Ok(())
            } else {
                Err(ReconError::SignatureInvalid("mismatch".to_string()))
            }
        }

        fn parse_notification(&self, payload: &[u8]) -> ReconResult<PaymentNotification> {
            let event: StubEvent = serde_json::from_slice(payload)
                .map_err(|e| ReconError::WebhookParseError(e.to_string()))?;
            let kind = match event.event.as_str() {
                "charge.success" => NotificationKind::Success,
                "charge.failed" => NotificationKind::Failed,
                _ => NotificationKind::Unknown,
            };
            Ok(PaymentNotification {
                reference: event.reference,
                event: event.event,
                kind,
                amount: event.amount,
                currency: Currency::parse(&event.currency).unwrap_or_default(),
                metadata: event.metadata,
            })
        }

        fn provider_name(&self) -> &'static str {
            "stub"
        }
    }

    fn reconciler_with(items: &[(&str, u32)]) -> PaymentReconciler {
        let ledger = Arc::new(InventoryLedger::new());
        for (id, quantity) in items {
            ledger.add_item(ItemConfig {
                id: id.to_string(),
                name: id.to_string(),
                unit_price: Price::from_minor(350, Currency::NGN),
                quantity: *quantity,
            });
        }
        PaymentReconciler::new(
            Arc::new(StubProvider),
            IdempotencyStore::new(),
            ledger,
            Arc::new(NullDispatcher),
        )
    }

    fn success_body(reference: &str, lines: &[(&str, u32)], amount: i64) -> Vec<u8> {
        let metadata = json!({
            "customer_name": "Ada",
            "customer_email": "ada@example.com",
            "lines": lines
                .iter()
                .map(|(id, q)| json!({"item_id": id, "quantity": q}))
                .collect::<Vec<_>>(),
        });
        serde_json::to_vec(&json!({
            "event": "charge.success",
            "reference": reference,
            "amount": amount,
            "currency": "NGN",
            "metadata": metadata,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_success_creates_order_and_deducts_once() {
        // Scenario A: quantity 5, order for 3, resulting quantity 2
        let reconciler = reconciler_with(&[("espresso", 5)]);
        let body = success_body("ref_a", &[("espresso", 3)], 1050);

        let result = reconciler
            .handle_notification(&body, GOOD_SIGNATURE)
            .await
            .unwrap();

        let record = result.record();
        let Outcome::OrderCreated { order_id } = &record.outcome else {
            panic!("expected an order, got {:?}", record.outcome);
        };
        assert_eq!(reconciler.ledger().available("espresso").await, Some(2));
        assert_eq!(reconciler.orders().count(), 1);

        let order = reconciler.orders().get(order_id).unwrap();
        assert_eq!(order.total.amount, 1050);
        assert_eq!(order.provider_reference, "ref_a");
    }

    #[tokio::test]
    async fn test_redelivery_replays_without_second_deduction() {
        // Scenario B: same reference redelivered
        let reconciler = reconciler_with(&[("espresso", 5)]);
        let body = success_body("ref_b", &[("espresso", 3)], 1050);

        let first = reconciler
            .handle_notification(&body, GOOD_SIGNATURE)
            .await
            .unwrap();
        let second = reconciler
            .handle_notification(&body, GOOD_SIGNATURE)
            .await
            .unwrap();

        assert!(matches!(second, ProcessingResult::Duplicate { .. }));
        assert_eq!(first.record().outcome, second.record().outcome);
        assert_eq!(reconciler.ledger().available("espresso").await, Some(2));
        assert_eq!(reconciler.orders().count(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_duplicate_deliveries() {
        let reconciler = Arc::new(reconciler_with(&[("espresso", 5)]));
        let body = success_body("ref_burst", &[("espresso", 3)], 1050);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let reconciler = reconciler.clone();
            let body = body.clone();
            handles.push(tokio::spawn(async move {
                reconciler.handle_notification(&body, GOOD_SIGNATURE).await
            }));
        }

        let mut order_ids = Vec::new();
        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            if let Outcome::OrderCreated { order_id } = &result.record().outcome {
                order_ids.push(order_id.clone());
            }
        }

        // Every delivery observed the same single order
        assert_eq!(order_ids.len(), 8);
        order_ids.dedup();
        assert_eq!(order_ids.len(), 1);
        assert_eq!(reconciler.orders().count(), 1);
        assert_eq!(reconciler.ledger().available("espresso").await, Some(2));
    }

    #[tokio::test]
    async fn test_insufficient_stock_records_failure() {
        // Scenario C: quantity 0, order for 1
        let reconciler = reconciler_with(&[("espresso", 0)]);
        let body = success_body("ref_c", &[("espresso", 1)], 350);

        let result = reconciler
            .handle_notification(&body, GOOD_SIGNATURE)
            .await
            .unwrap();

        assert!(matches!(
            result.record().outcome,
            Outcome::Failed {
                reason: FailureReason::InsufficientStock { .. }
            }
        ));
        assert_eq!(reconciler.orders().count(), 0);
        assert_eq!(reconciler.ledger().available("espresso").await, Some(0));
    }

    #[tokio::test]
    async fn test_failure_outcome_replays_even_after_restock() {
        let reconciler = reconciler_with(&[("espresso", 0)]);
        let body = success_body("ref_restock", &[("espresso", 1)], 350);

        reconciler
            .handle_notification(&body, GOOD_SIGNATURE)
            .await
            .unwrap();

        // Stock changes later; the recorded outcome still stands
        reconciler.ledger().add_item(ItemConfig {
            id: "espresso".to_string(),
            name: "espresso".to_string(),
            unit_price: Price::from_minor(350, Currency::NGN),
            quantity: 5,
        });

        let replay = reconciler
            .handle_notification(&body, GOOD_SIGNATURE)
            .await
            .unwrap();
        assert!(matches!(replay, ProcessingResult::Duplicate { .. }));
        assert!(matches!(replay.record().outcome, Outcome::Failed { .. }));
        assert_eq!(reconciler.ledger().available("espresso").await, Some(5));
        assert_eq!(reconciler.orders().count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_signature_mutates_nothing() {
        // Scenario D: tampered body, invalid signature
        let reconciler = reconciler_with(&[("espresso", 5)]);
        let body = success_body("ref_d", &[("espresso", 3)], 1050);

        let err = reconciler
            .handle_notification(&body, "wrong-signature")
            .await
            .unwrap_err();

        assert!(matches!(err, ReconError::SignatureInvalid(_)));
        assert_eq!(reconciler.ledger().available("espresso").await, Some(5));
        assert_eq!(reconciler.orders().count(), 0);
        assert_eq!(reconciler.status("ref_d"), ReferenceStatus::Unknown);
    }

    #[tokio::test]
    async fn test_non_success_event_is_ignored_and_audited() {
        let reconciler = reconciler_with(&[("espresso", 5)]);
        let body = serde_json::to_vec(&json!({
            "event": "charge.failed",
            "reference": "ref_failed",
            "amount": 1050,
            "currency": "NGN",
            "metadata": null,
        }))
        .unwrap();

        let result = reconciler
            .handle_notification(&body, GOOD_SIGNATURE)
            .await
            .unwrap();

        assert_eq!(
            result.record().outcome,
            Outcome::Ignored {
                event: "charge.failed".to_string()
            }
        );
        assert_eq!(reconciler.orders().count(), 0);
        assert!(matches!(
            reconciler.status("ref_failed"),
            ReferenceStatus::Settled(_)
        ));
    }

    #[tokio::test]
    async fn test_item_not_found_records_failure() {
        let reconciler = reconciler_with(&[("espresso", 5)]);
        let body = success_body("ref_ghost", &[("ghost", 1)], 350);

        let result = reconciler
            .handle_notification(&body, GOOD_SIGNATURE)
            .await
            .unwrap();

        assert!(matches!(
            result.record().outcome,
            Outcome::Failed {
                reason: FailureReason::ItemNotFound { .. }
            }
        ));
        assert_eq!(reconciler.ledger().available("espresso").await, Some(5));
    }

    #[tokio::test]
    async fn test_empty_cart_records_invalid_metadata() {
        let reconciler = reconciler_with(&[("espresso", 5)]);
        let body = success_body("ref_empty", &[], 0);

        let result = reconciler
            .handle_notification(&body, GOOD_SIGNATURE)
            .await
            .unwrap();

        assert!(matches!(
            result.record().outcome,
            Outcome::Failed {
                reason: FailureReason::InvalidMetadata { .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_catalog_price_overrides_declared_amount() {
        let reconciler = reconciler_with(&[("espresso", 5)]);
        // Declared amount is wrong on purpose (price tampering)
        let body = success_body("ref_tamper", &[("espresso", 2)], 1);

        let result = reconciler
            .handle_notification(&body, GOOD_SIGNATURE)
            .await
            .unwrap();

        let Outcome::OrderCreated { order_id } = &result.record().outcome else {
            panic!("expected an order");
        };
        let order = reconciler.orders().get(order_id).unwrap();
        assert_eq!(order.total.amount, 700);
    }

    #[tokio::test]
    async fn test_status_reflects_webhook_terminal_state() {
        let reconciler = reconciler_with(&[("espresso", 5)]);
        let body = success_body("ref_status", &[("espresso", 1)], 350);

        assert_eq!(reconciler.status("ref_status"), ReferenceStatus::Unknown);
        reconciler
            .handle_notification(&body, GOOD_SIGNATURE)
            .await
            .unwrap();

        match reconciler.status("ref_status") {
            ReferenceStatus::Settled(record) => {
                assert!(matches!(record.outcome, Outcome::OrderCreated { .. }));
            }
            other => panic!("expected settled, got {other:?}"),
        }
    }
}
