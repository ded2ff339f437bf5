//! # Idempotency Store
//!
//! Records which provider references have already been processed, with the
//! terminal outcome. The store is what makes at-least-once webhook delivery
//! safe: the first attempt for a reference atomically reserves it, duplicate
//! deliveries either replay the settled outcome or wait (bounded) for the
//! in-flight attempt to settle.
//!
//! A reservation abandoned without an outcome (transient failure) is
//! released on guard drop, so the key is not consumed and a legitimate
//! redelivery can still succeed.

use crate::error::{ReconError, ReconResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{timeout, Instant};

/// Default bound on waiting for a concurrent in-flight attempt to settle
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// How often a waiter re-checks the slot while waiting
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Why a verified success notification did not become an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    ItemNotFound {
        item_id: String,
    },
    InsufficientStock {
        item_id: String,
        requested: u32,
        available: u32,
    },
    InvalidMetadata {
        message: String,
    },
}

/// Terminal outcome recorded for a provider reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// A successful payment settled into exactly one order
    OrderCreated { order_id: String },
    /// Non-success event (failed/pending/unknown), recorded for audit
    Ignored { event: String },
    /// Validation or stock failure; redeliveries replay this instead of
    /// re-attempting reservation against possibly-changed stock
    Failed { reason: FailureReason },
}

/// A settled idempotency record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub reference: String,
    pub outcome: Outcome,
    pub settled_at: DateTime<Utc>,
}

/// What the status endpoint can say about a reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReferenceStatus {
    Unknown,
    InProgress,
    Settled(IdempotencyRecord),
}

#[derive(Debug)]
enum Slot {
    InFlight(Arc<Notify>),
    Settled(IdempotencyRecord),
}

/// Result of [`IdempotencyStore::begin`]
#[derive(Debug)]
pub enum Begin {
    /// This is the first attempt; the guard holds the reservation
    Fresh(ProcessingGuard),
    /// The reference already settled; replay the stored record
    Replay(IdempotencyRecord),
}

/// In-memory idempotency store, cheap to clone and share
#[derive(Debug, Clone)]
pub struct IdempotencyStore {
    inner: Arc<Mutex<HashMap<String, Slot>>>,
    wait_timeout: Duration,
}

impl IdempotencyStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }

    /// Override the in-flight wait bound
    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    /// Reserve a reference for processing or replay its settled outcome.
    ///
    /// If another attempt is in flight for the same reference, waits up to
    /// the configured bound for it to settle; expiry is a retryable
    /// [`ReconError::LockTimeout`], never a second execution.
    pub async fn begin(&self, reference: &str) -> ReconResult<Begin> {
        let deadline = Instant::now() + self.wait_timeout;

        loop {
            let notify = {
                let mut map = self.lock_map();
                match map.get(reference) {
                    None => {
                        map.insert(
                            reference.to_string(),
                            Slot::InFlight(Arc::new(Notify::new())),
                        );
                        return Ok(Begin::Fresh(ProcessingGuard {
                            store: self.clone(),
                            reference: reference.to_string(),
                            armed: true,
                        }));
                    }
                    Some(Slot::Settled(record)) => return Ok(Begin::Replay(record.clone())),
                    Some(Slot::InFlight(notify)) => notify.clone(),
                }
            };

            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return Err(ReconError::LockTimeout {
                    resource: format!("idempotency:{reference}"),
                });
            };
            if remaining.is_zero() {
                return Err(ReconError::LockTimeout {
                    resource: format!("idempotency:{reference}"),
                });
            }

            // Wake on settlement if possible, re-check periodically otherwise
            let _ = timeout(remaining.min(POLL_INTERVAL), notify.notified()).await;
        }
    }

    /// Status for the polling endpoint
    pub fn status(&self, reference: &str) -> ReferenceStatus {
        match self.lock_map().get(reference) {
            None => ReferenceStatus::Unknown,
            Some(Slot::InFlight(_)) => ReferenceStatus::InProgress,
            Some(Slot::Settled(record)) => ReferenceStatus::Settled(record.clone()),
        }
    }

    /// Settled record for a reference, if any
    pub fn record(&self, reference: &str) -> Option<IdempotencyRecord> {
        match self.lock_map().get(reference) {
            Some(Slot::Settled(record)) => Some(record.clone()),
            _ => None,
        }
    }

    fn lock_map(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        // Held only for map operations, never across an await
        self.inner.lock().expect("idempotency map lock poisoned")
    }
}

impl Default for IdempotencyStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds the in-flight reservation for one reference.
///
/// Call [`ProcessingGuard::complete`] with the terminal outcome; dropping
/// the guard without completing releases the reference.
#[derive(Debug)]
pub struct ProcessingGuard {
    store: IdempotencyStore,
    reference: String,
    armed: bool,
}

impl ProcessingGuard {
    /// The reserved provider reference
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Record the terminal outcome for this reference.
    ///
    /// Finding a different outcome already recorded is an invariant
    /// violation and halts processing of the request.
    pub fn complete(mut self, outcome: Outcome) -> ReconResult<IdempotencyRecord> {
        self.armed = false;
        let record = IdempotencyRecord {
            reference: self.reference.clone(),
            outcome,
            settled_at: Utc::now(),
        };

        let mut map = self.store.lock_map();
        match map.insert(self.reference.clone(), Slot::Settled(record.clone())) {
            Some(Slot::InFlight(notify)) => {
                notify.notify_waiters();
                Ok(record)
            }
            Some(Slot::Settled(previous)) => {
                // Put the original back; two outcomes for one reference is fatal
                let conflict = previous.outcome != record.outcome;
                map.insert(self.reference.clone(), Slot::Settled(previous));
                if conflict {
                    Err(ReconError::IdempotencyConflict {
                        reference: self.reference.clone(),
                        message: "a different outcome was already recorded".to_string(),
                    })
                } else {
                    Ok(record)
                }
            }
            None => Err(ReconError::Internal(format!(
                "idempotency slot vanished for reference {}",
                self.reference
            ))),
        }
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // Transient failure path: release the key so redelivery can succeed
        let mut map = self.store.lock_map();
        if let Some(Slot::InFlight(notify)) = map.remove(&self.reference) {
            notify.notify_waiters();
        }
    }
}
