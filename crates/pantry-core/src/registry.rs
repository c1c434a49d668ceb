//! Item identity registry.
//!
//! Maps a normalized item name to a stable [`Uuid`]. An identity is created
//! the first time a name is seen and reused for the lifetime of the
//! pantry: entries are never removed or reassigned, so the registry only
//! grows. Matching is exact on the normalized string; "Heinz Ketchup" and
//! "Ketchup" are different items.
//!
//! The registry here is the in-memory half. Durability (persisting a new
//! mapping before the id is handed out) is the job of whoever owns the
//! enclosing [`PantryRecord`](crate::models::PantryRecord).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PantryError;
use crate::models::normalize_name;

/// Normalized name → id mapping, serialized as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemRegistry(BTreeMap<String, Uuid>);

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name` to its id, creating a fresh identity if needed.
    ///
    /// Returns the id and whether it was newly created.
    pub fn resolve(&mut self, name: &str) -> Result<(Uuid, bool), PantryError> {
        let key = normalize_name(name);
        if key.is_empty() {
            return Err(PantryError::EmptyName);
        }
        if let Some(id) = self.0.get(&key) {
            return Ok((*id, false));
        }
        let id = Uuid::new_v4();
        self.0.insert(key, id);
        Ok((id, true))
    }

    /// Look up an existing identity without creating one.
    pub fn get(&self, name: &str) -> Option<Uuid> {
        self.0.get(&normalize_name(name)).copied()
    }

    pub fn contains_id(&self, id: &Uuid) -> bool {
        self.0.values().any(|v| v == id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Uuid)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}
