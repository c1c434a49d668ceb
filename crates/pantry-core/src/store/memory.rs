//! In-memory [`RecordStore`] implementation for testing.
//!
//! Holds the record behind `std::sync::RwLock`. Swapping the whole value
//! under the write lock gives the same all-or-nothing visibility a
//! rename-on-write file store does.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::PantryRecord;

use super::RecordStore;

/// In-memory store for tests and embedding.
pub struct InMemoryStore {
    record: RwLock<Option<PantryRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            record: RwLock::new(None),
        }
    }

    /// Start from an existing record.
    pub fn with_record(record: PantryRecord) -> Self {
        Self {
            record: RwLock::new(Some(record)),
        }
    }

    /// Whether anything has been saved yet.
    pub fn is_initialized(&self) -> bool {
        self.record.read().map(|r| r.is_some()).unwrap_or(false)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn load(&self) -> Result<PantryRecord> {
        let guard = self
            .record
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        Ok(guard.clone().unwrap_or_default())
    }

    async fn save(&self, record: &PantryRecord) -> Result<()> {
        let mut guard = self
            .record
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        *guard = Some(record.clone());
        Ok(())
    }
}
