//! # Inventory Ledger
//!
//! Owns every item quantity in the system. Quantities are mutated only
//! through [`InventoryLedger::reserve`] and [`InventoryLedger::release`];
//! no caller ever reads-then-writes a quantity directly.
//!
//! Reservations acquire per-item locks in ascending item-id order, one at a
//! time, with a bounded acquisition timeout. A failed line releases every
//! line already reserved in the same attempt, so an order is never left
//! partially committed.

use crate::error::{ReconError, ReconResult};
use crate::money::Price;
use crate::order::CartLine;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Default bound on a single per-item lock acquisition
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// Read-only view of an item's catalog data
#[derive(Debug, Clone, Serialize)]
pub struct ItemSnapshot {
    pub id: String,
    pub name: String,
    pub unit_price: Price,
}

/// One catalog item as declared in `config/inventory.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemConfig {
    pub id: String,
    pub name: String,
    pub unit_price: Price,
    pub quantity: u32,
}

/// Inventory catalog file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryCatalog {
    pub items: Vec<ItemConfig>,
}

impl InventoryCatalog {
    /// Load catalog from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

struct ItemSlot {
    name: String,
    unit_price: Price,
    quantity: Mutex<u32>,
}

/// A successful multi-line reservation. Quantities have already been
/// deducted; [`InventoryLedger::release`] re-credits them.
#[derive(Debug)]
pub struct Reservation {
    lines: Vec<(String, u32)>,
}

impl Reservation {
    /// Item ids and quantities held by this reservation
    pub fn lines(&self) -> &[(String, u32)] {
        &self.lines
    }
}

/// The shared inventory ledger
pub struct InventoryLedger {
    items: RwLock<HashMap<String, Arc<ItemSlot>>>,
    lock_timeout: Duration,
}

impl InventoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Build a ledger from a catalog file
    pub fn from_catalog(catalog: InventoryCatalog) -> Self {
        let ledger = Self::new();
        for item in catalog.items {
            ledger.add_item(item);
        }
        ledger
    }

    /// Override the per-item lock acquisition bound
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Register an item (catalog management is external; this is the load path)
    pub fn add_item(&self, item: ItemConfig) {
        let slot = Arc::new(ItemSlot {
            name: item.name,
            unit_price: item.unit_price,
            quantity: Mutex::new(item.quantity),
        });
        self.items
            .write()
            .expect("inventory map lock poisoned")
            .insert(item.id, slot);
    }

    fn slot(&self, item_id: &str) -> Option<Arc<ItemSlot>> {
        self.items
            .read()
            .expect("inventory map lock poisoned")
            .get(item_id)
            .cloned()
    }

    /// Catalog lookup for server-side price derivation
    pub fn snapshot(&self, item_id: &str) -> Option<ItemSnapshot> {
        self.slot(item_id).map(|slot| ItemSnapshot {
            id: item_id.to_string(),
            name: slot.name.clone(),
            unit_price: slot.unit_price,
        })
    }

    /// All catalog snapshots, sorted by id
    pub fn snapshots(&self) -> Vec<ItemSnapshot> {
        let ids: Vec<String> = {
            let map = self.items.read().expect("inventory map lock poisoned");
            let mut ids: Vec<String> = map.keys().cloned().collect();
            ids.sort();
            ids
        };
        ids.iter().filter_map(|id| self.snapshot(id)).collect()
    }

    /// Current available quantity (test and reporting hook)
    pub async fn available(&self, item_id: &str) -> Option<u32> {
        let slot = self.slot(item_id)?;
        let qty = slot.quantity.lock().await;
        Some(*qty)
    }

    /// Atomically reserve every line or nothing.
    ///
    /// Lines for the same item are merged. Items are visited in ascending id
    /// order; each conditional decrement runs under that item's mutex,
    /// acquired within `lock_timeout`. On `ItemNotFound`,
    /// `InsufficientStock`, or `LockTimeout`, everything reserved so far in
    /// this attempt is released before the error returns.
    pub async fn reserve(&self, lines: &[CartLine]) -> ReconResult<Reservation> {
        // BTreeMap gives the fixed ascending acquisition order
        let mut wanted: BTreeMap<&str, u32> = BTreeMap::new();
        for line in lines {
            *wanted.entry(line.item_id.as_str()).or_insert(0) += line.quantity;
        }

        let mut reserved: Vec<(String, u32)> = Vec::with_capacity(wanted.len());

        for (item_id, quantity) in wanted {
            match self.reserve_one(item_id, quantity).await {
                Ok(()) => reserved.push((item_id.to_string(), quantity)),
                Err(err) => {
                    self.release_lines(&reserved).await;
                    return Err(err);
                }
            }
        }

        Ok(Reservation { lines: reserved })
    }

    async fn reserve_one(&self, item_id: &str, quantity: u32) -> ReconResult<()> {
        let slot = self
            .slot(item_id)
            .ok_or_else(|| ReconError::ItemNotFound {
                item_id: item_id.to_string(),
            })?;

        let mut available = timeout(self.lock_timeout, slot.quantity.lock())
            .await
            .map_err(|_| ReconError::LockTimeout {
                resource: format!("item:{item_id}"),
            })?;

        if *available < quantity {
            return Err(ReconError::InsufficientStock {
                item_id: item_id.to_string(),
                requested: quantity,
                available: *available,
            });
        }

        *available -= quantity;
        Ok(())
    }

    /// Re-credit a reservation (compensating rollback)
    pub async fn release(&self, reservation: Reservation) {
        self.release_lines(&reservation.lines).await;
    }

    async fn release_lines(&self, lines: &[(String, u32)]) {
        for (item_id, quantity) in lines {
            if let Some(slot) = self.slot(item_id) {
                // No timeout here: a release must always land
                let mut available = slot.quantity.lock().await;
                *available += quantity;
            }
        }
    }
}

impl Default for InventoryLedger {
    fn default() -> Self {
        Self::new()
    }
}
