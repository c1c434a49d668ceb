//! Storage abstraction for Pantry Tracker.
//!
//! The [`RecordStore`] trait is the durable key-value stand-in holding the
//! single [`PantryRecord`]. Every access is a whole-record read or write;
//! there are no field-level updates. Serializing read-modify-write cycles
//! is the caller's concern (see the app crate's `Ledger`).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::PantryRecord;

/// Abstract durable storage for the pantry record.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`load`](RecordStore::load) | Read the current record (empty default if absent or unreadable) |
/// | [`save`](RecordStore::save) | Replace the record atomically |
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read the current record.
    ///
    /// A missing record yields [`PantryRecord::default`]. A corrupted one
    /// is treated the same way: availability wins over strict consistency.
    async fn load(&self) -> Result<PantryRecord>;

    /// Replace the stored record.
    ///
    /// Readers must observe either the old or the new record, never a mix.
    async fn save(&self, record: &PantryRecord) -> Result<()>;
}
