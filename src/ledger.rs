//! Single-writer owner of the pantry record.
//!
//! The identity registry and the inventory snapshot live in one durable
//! record, and every change is a full load → mutate → save cycle. The
//! [`Ledger`] runs each cycle under one async mutex, so concurrent
//! reconciliations and manual edits never interleave and two first-time
//! resolutions of the same new name always agree on one id.
//!
//! Reads (`inventory`, `snapshot`, `ingredient_names`) take a
//! point-in-time copy and do not wait on writers beyond the store's own
//! atomic swap.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`resolve`](Ledger::resolve) | Stable id for a name, persisted before returning |
//! | [`reconcile`](Ledger::reconcile) | Apply an analyzer judgment |
//! | [`reconcile_dispatch`](Ledger::reconcile_dispatch) | Apply a judgment for a numbered capture pair, reporting out-of-order writes |
//! | [`add_item`](Ledger::add_item) | Append one manually entered item |
//! | [`delete_item`](Ledger::delete_item) | Remove one inventory entry by id |
//! | [`replace_inventory`](Ledger::replace_inventory) | Overwrite the full inventory by hand |

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use pantry_core::judgment::Judgment;
use pantry_core::models::{PantryItem, PantryRecord};
use pantry_core::reconcile::reconcile;
use pantry_core::store::RecordStore;
use pantry_core::PantryError;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// A manually entered inventory line for [`Ledger::replace_inventory`].
#[derive(Debug, Clone, Deserialize)]
pub struct ManualItem {
    pub name: String,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub date_added: Option<NaiveDate>,
}

/// Result of [`Ledger::reconcile_dispatch`].
#[derive(Debug, Clone)]
pub struct Applied {
    pub record: PantryRecord,
    /// Set when a pair with a higher sequence had already been applied;
    /// this write replaced that newer snapshot.
    pub overwrote: Option<u64>,
}

pub struct Ledger {
    store: Arc<dyn RecordStore>,
    /// Guards every write; holds the highest dispatch sequence applied.
    write_lock: Mutex<u64>,
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

impl Ledger {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(0),
        }
    }

    /// Resolve `name` to its stable id.
    ///
    /// A newly created identity is saved before the id is returned.
    pub async fn resolve(&self, name: &str) -> Result<Uuid> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.store.load().await?;
        let (id, created) = record.item_registry.resolve(name)?;
        if created {
            self.store.save(&record).await?;
            debug!(name, %id, "created item identity");
        }
        Ok(id)
    }

    /// Apply a judgment and persist the resulting record.
    pub async fn reconcile(&self, judgment: &Judgment) -> Result<PantryRecord> {
        self.reconcile_on(judgment, today()).await
    }

    /// [`reconcile`](Self::reconcile) with an explicit reconciliation date.
    pub async fn reconcile_on(&self, judgment: &Judgment, on: NaiveDate) -> Result<PantryRecord> {
        let _guard = self.write_lock.lock().await;
        self.apply(judgment, on).await
    }

    /// Apply the judgment for capture pair `seq`.
    ///
    /// Pairs are still last-writer-wins, but the ordering check runs under
    /// the write lock, so [`Applied::overwrote`] reflects the order in which
    /// saves actually happened.
    pub async fn reconcile_dispatch(&self, judgment: &Judgment, seq: u64) -> Result<Applied> {
        let mut latest = self.write_lock.lock().await;
        let record = self.apply(judgment, today()).await?;

        let overwrote = if *latest > seq {
            Some(*latest)
        } else {
            *latest = seq;
            None
        };
        Ok(Applied { record, overwrote })
    }

    async fn apply(&self, judgment: &Judgment, on: NaiveDate) -> Result<PantryRecord> {
        let previous = self.store.load().await?;
        let outcome = reconcile(previous, judgment, on);
        self.store.save(&outcome.record).await?;

        info!(
            added = outcome.record.items_added.len(),
            removed = outcome.record.items_removed.len(),
            inventory = outcome.record.current_full_inventory.len(),
            new_identities = outcome.new_identities,
            dropped = outcome.dropped_names.len(),
            "reconciled pantry"
        );
        Ok(outcome.record)
    }

    /// Append one item entered by hand, stamped as added today.
    ///
    /// Bypasses analysis entirely; `items_added`/`items_removed` are left
    /// as the last reconciliation produced them.
    pub async fn add_item(&self, name: &str, expiry_date: Option<NaiveDate>) -> Result<PantryItem> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.store.load().await?;
        let (id, _) = record.item_registry.resolve(name)?;
        let item = PantryItem {
            id,
            name: name.trim().to_string(),
            expiry_date,
            date_added: Some(today()),
        };
        record.current_full_inventory.push(item.clone());
        self.store.save(&record).await?;

        info!(name = %item.name, %id, "added item");
        Ok(item)
    }

    /// Remove the inventory entry with `id`.
    ///
    /// Returns [`PantryError::NotFound`] without writing anything if no
    /// entry matches. When the same id appears more than once, the first
    /// entry is removed.
    pub async fn delete_item(&self, id: Uuid) -> Result<PantryItem> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.store.load().await?;
        let pos = record
            .current_full_inventory
            .iter()
            .position(|item| item.id == id)
            .ok_or(PantryError::NotFound(id))?;
        let removed = record.current_full_inventory.remove(pos);
        self.store.save(&record).await?;

        info!(name = %removed.name, %id, "deleted item");
        Ok(removed)
    }

    /// Overwrite the full inventory with a hand-edited list.
    ///
    /// Ids are resolved from names, so an edited entry keeps its identity.
    /// Blank names are rejected before anything is written.
    pub async fn replace_inventory(&self, items: &[ManualItem]) -> Result<Vec<PantryItem>> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.store.load().await?;

        let mut registry = record.item_registry.clone();
        let mut inventory = Vec::with_capacity(items.len());
        for item in items {
            let (id, _) = registry.resolve(&item.name)?;
            inventory.push(PantryItem {
                id,
                name: item.name.trim().to_string(),
                expiry_date: item.expiry_date,
                date_added: item.date_added.or(Some(today())),
            });
        }

        record.item_registry = registry;
        record.current_full_inventory = inventory.clone();
        self.store.save(&record).await?;

        info!(inventory = inventory.len(), "replaced inventory");
        Ok(inventory)
    }

    /// Point-in-time copy of the current inventory.
    pub async fn inventory(&self) -> Result<Vec<PantryItem>> {
        Ok(self.store.load().await?.current_full_inventory)
    }

    /// Point-in-time copy of the whole record.
    pub async fn snapshot(&self) -> Result<PantryRecord> {
        self.store.load().await
    }

    /// Current inventory names for the recipe-suggestion feature.
    pub async fn ingredient_names(&self) -> Result<Vec<String>> {
        Ok(self.store.load().await?.ingredient_names())
    }
}
