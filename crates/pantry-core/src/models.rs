//! Core data models used throughout Pantry Tracker.
//!
//! A [`PantryRecord`] is the single durable record: the identity registry
//! plus the current inventory and the deltas of the most recent
//! reconciliation. It serializes to the four-field JSON layout shared by
//! every store backend.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registry::ItemRegistry;

/// Normalize an item name into its registry key: trimmed and lowercased.
///
/// ```rust
/// use pantry_core::models::normalize_name;
///
/// assert_eq!(normalize_name("  Ketchup "), "ketchup");
/// assert_ne!(normalize_name("Heinz Ketchup"), normalize_name("Ketchup"));
/// ```
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// One entry of the inventory.
///
/// `id` always equals the registry id of `name`'s normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PantryItem {
    pub id: Uuid,
    /// Display name in the casing it was reported with. Surrounding
    /// whitespace is trimmed before storing; inner spacing and case are kept.
    pub name: String,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub date_added: Option<NaiveDate>,
}

/// The persisted pantry state.
///
/// All four fields are always written; missing fields on load default to
/// empty collections. `item_registry` only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PantryRecord {
    #[serde(default)]
    pub item_registry: ItemRegistry,
    #[serde(default)]
    pub items_added: Vec<PantryItem>,
    #[serde(default)]
    pub items_removed: Vec<PantryItem>,
    #[serde(default)]
    pub current_full_inventory: Vec<PantryItem>,
}

impl PantryRecord {
    /// Names of the current inventory, trimmed, blanks skipped.
    ///
    /// This is the flat list handed to the recipe-suggestion feature.
    pub fn ingredient_names(&self) -> Vec<String> {
        self.current_full_inventory
            .iter()
            .map(|item| item.name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}
