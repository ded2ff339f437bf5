//! # Paystack Webhook Handling
//!
//! Signature verification and event parsing for Paystack webhooks.
//!
//! Paystack signs the raw request body with HMAC-SHA512 keyed by the
//! account's secret key and sends the hex digest in the
//! `X-Paystack-Signature` header. Verification here runs over the bytes as
//! received on the wire; re-serializing the parsed JSON would change the
//! byte layout and break legitimate signatures.

use sell_core::{CartMetadata, Currency, NotificationKind, PaymentNotification, ReconError, ReconResult};
use serde::Deserialize;
use tracing::debug;

/// Compute the hex-encoded HMAC-SHA512 of a payload
pub fn compute_signature(secret: &str, payload: &[u8]) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha512;

    type HmacSha512 = Hmac<Sha512>;

    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a claimed signature against the raw body.
///
/// Malformed signatures are simply invalid; this never fails for any input.
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    let expected = compute_signature(secret, payload);
    constant_time_compare(signature, &expected)
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[derive(Debug, Deserialize)]
struct PaystackEvent {
    event: String,
    data: PaystackEventData,
}

#[derive(Debug, Deserialize)]
struct PaystackEventData {
    reference: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    amount: i64,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

/// Parse a verified Paystack event body into a [`PaymentNotification`]
pub fn parse_event(payload: &[u8]) -> ReconResult<PaymentNotification> {
    let event: PaystackEvent = serde_json::from_slice(payload)
        .map_err(|e| ReconError::WebhookParseError(format!("Failed to parse webhook: {e}")))?;

    let kind = classify(&event.event, event.data.status.as_deref());

    // The metadata envelope comes back from checkout initiation; a missing
    // or malformed envelope settles downstream as an invalid-metadata
    // failure rather than a parse error here
    let metadata = event.data.metadata.and_then(|value| {
        match serde_json::from_value::<CartMetadata>(value) {
            Ok(metadata) => Some(metadata),
            Err(err) => {
                debug!(%err, "webhook metadata did not match the cart envelope");
                None
            }
        }
    });

    let currency = event
        .data
        .currency
        .as_deref()
        .and_then(Currency::parse)
        .unwrap_or_default();

    Ok(PaymentNotification {
        reference: event.data.reference,
        event: event.event,
        kind,
        amount: event.data.amount,
        currency,
        metadata,
    })
}

fn classify(event: &str, status: Option<&str>) -> NotificationKind {
    match event {
        "charge.success" => match status {
            Some("success") | None => NotificationKind::Success,
            Some("pending") => NotificationKind::Pending,
            Some(_) => NotificationKind::Failed,
        },
        "charge.failed" => NotificationKind::Failed,
        _ => NotificationKind::Unknown,
    }
}
