//! Reconciliation of a judgment into the pantry record.
//!
//! [`reconcile`] maps every name in a [`Judgment`] through the identity
//! registry and builds the next [`PantryRecord`]:
//!
//! | Output field | Source | `expiry_date` | `date_added` |
//! |--------------|--------|---------------|--------------|
//! | `items_added` | `judgment.items_added` | as reported | `today` |
//! | `items_removed` | `judgment.items_removed` | `None` | `None` |
//! | `current_full_inventory` | `judgment.current_full_inventory` | as reported | kept from the previous inventory for a known id, else `today` |
//! | `item_registry` | previous registry | extended, never shrunk | |
//!
//! The full inventory is replaced wholesale: anything the model no longer
//! sees is gone, whether or not it was listed as removed. `items_added`
//! and `items_removed` describe this cycle only.
//!
//! Each name resolves independently. A name that cannot be resolved (blank
//! after normalization) is dropped with a warning and the rest of the
//! judgment still applies.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::warn;
use uuid::Uuid;

use crate::judgment::Judgment;
use crate::models::{PantryItem, PantryRecord};
use crate::registry::ItemRegistry;

/// Outcome of one reconciliation.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub record: PantryRecord,
    /// Identities created during this reconciliation.
    pub new_identities: usize,
    /// Names that could not be resolved and were dropped.
    pub dropped_names: Vec<String>,
}

/// Build the next record from `previous` and `judgment`.
///
/// Pure: no I/O, and `today` is passed in so the result is deterministic.
pub fn reconcile(previous: PantryRecord, judgment: &Judgment, today: NaiveDate) -> Reconciled {
    let PantryRecord {
        item_registry,
        current_full_inventory: previous_inventory,
        ..
    } = previous;

    let first_seen: HashMap<Uuid, Option<NaiveDate>> = previous_inventory
        .iter()
        .map(|item| (item.id, item.date_added))
        .collect();

    let mut resolver = Resolver::new(item_registry);

    let items_added = judgment
        .items_added
        .iter()
        .filter_map(|item| {
            resolver.resolve(&item.name).map(|id| PantryItem {
                id,
                name: item.name.trim().to_string(),
                expiry_date: item.expiry_date,
                date_added: Some(today),
            })
        })
        .collect();

    let items_removed = judgment
        .items_removed
        .iter()
        .filter_map(|name| {
            resolver.resolve(name).map(|id| PantryItem {
                id,
                name: name.trim().to_string(),
                expiry_date: None,
                date_added: None,
            })
        })
        .collect();

    let current_full_inventory = judgment
        .current_full_inventory
        .iter()
        .filter_map(|item| {
            resolver.resolve(&item.name).map(|id| PantryItem {
                id,
                name: item.name.trim().to_string(),
                expiry_date: item.expiry_date,
                date_added: first_seen.get(&id).copied().flatten().or(Some(today)),
            })
        })
        .collect();

    Reconciled {
        record: PantryRecord {
            item_registry: resolver.registry,
            items_added,
            items_removed,
            current_full_inventory,
        },
        new_identities: resolver.created,
        dropped_names: resolver.dropped,
    }
}

struct Resolver {
    registry: ItemRegistry,
    created: usize,
    dropped: Vec<String>,
}

impl Resolver {
    fn new(registry: ItemRegistry) -> Self {
        Self {
            registry,
            created: 0,
            dropped: Vec::new(),
        }
    }

    fn resolve(&mut self, name: &str) -> Option<Uuid> {
        match self.registry.resolve(name) {
            Ok((id, created)) => {
                if created {
                    self.created += 1;
                }
                Some(id)
            }
            Err(e) => {
                warn!(name, error = %e, "dropping unresolvable item name");
                self.dropped.push(name.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judgment::JudgedItem;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn today() -> NaiveDate {
        date("2025-06-01")
    }

    #[test]
    fn test_milk_and_eggs() {
        let judgment = Judgment {
            items_added: vec![JudgedItem::new("Milk", Some(date("2025-01-01")))],
            items_removed: vec!["Eggs".to_string()],
            current_full_inventory: vec![JudgedItem::new("Milk", Some(date("2025-01-01")))],
        };
        let out = reconcile(PantryRecord::default(), &judgment, today());
        let rec = out.record;

        assert_eq!(rec.current_full_inventory.len(), 1);
        let milk = &rec.current_full_inventory[0];
        assert_eq!(milk.name, "Milk");
        assert_eq!(milk.expiry_date, Some(date("2025-01-01")));
        assert_eq!(Some(milk.id), rec.item_registry.get("milk"));

        assert_eq!(rec.items_removed.len(), 1);
        let eggs = &rec.items_removed[0];
        assert_eq!(eggs.name, "Eggs");
        assert_eq!(eggs.expiry_date, None);
        assert_eq!(Some(eggs.id), rec.item_registry.get("eggs"));

        assert_eq!(rec.items_added[0].id, milk.id);
        assert_eq!(out.new_identities, 2);
    }

    #[test]
    fn test_full_inventory_replaced_not_merged() {
        let first = Judgment {
            current_full_inventory: vec![
                JudgedItem::new("Bread", None),
                JudgedItem::new("Milk", None),
            ],
            ..Default::default()
        };
        let rec = reconcile(PantryRecord::default(), &first, today()).record;
        let bread_id = rec.item_registry.get("bread").unwrap();

        let second = Judgment {
            current_full_inventory: vec![JudgedItem::new("Milk", None)],
            ..Default::default()
        };
        let rec = reconcile(rec, &second, today()).record;

        assert!(rec.current_full_inventory.iter().all(|i| i.name != "Bread"));
        assert!(rec.items_removed.is_empty());
        // Identity survives removal from the inventory.
        assert_eq!(rec.item_registry.get("Bread"), Some(bread_id));
    }

    #[test]
    fn test_deltas_are_per_cycle() {
        let first = Judgment {
            items_added: vec![JudgedItem::new("Rice", None)],
            current_full_inventory: vec![JudgedItem::new("Rice", None)],
            ..Default::default()
        };
        let rec = reconcile(PantryRecord::default(), &first, today()).record;
        let rec = reconcile(
            rec,
            &Judgment {
                current_full_inventory: vec![JudgedItem::new("Rice", None)],
                ..Default::default()
            },
            today(),
        )
        .record;
        assert!(rec.items_added.is_empty());
    }

    #[test]
    fn test_registry_never_shrinks() {
        let mut rec = PantryRecord::default();
        let mut last = 0;
        for names in [vec!["A", "B"], vec![], vec!["C"], vec!["a"]] {
            let judgment = Judgment {
                current_full_inventory: names.iter().map(|n| JudgedItem::new(*n, None)).collect(),
                ..Default::default()
            };
            rec = reconcile(rec, &judgment, today()).record;
            assert!(rec.item_registry.len() >= last);
            last = rec.item_registry.len();
        }
        assert_eq!(last, 3);
    }

    #[test]
    fn test_date_added_preserved_for_known_items() {
        let judgment = Judgment {
            current_full_inventory: vec![JudgedItem::new("Coffee", None)],
            ..Default::default()
        };
        let rec = reconcile(PantryRecord::default(), &judgment, date("2025-01-10")).record;

        let judgment = Judgment {
            current_full_inventory: vec![
                JudgedItem::new("coffee ", Some(date("2026-01-01"))),
                JudgedItem::new("Tea", None),
            ],
            ..Default::default()
        };
        let rec = reconcile(rec, &judgment, date("2025-03-01")).record;

        let coffee = &rec.current_full_inventory[0];
        assert_eq!(coffee.date_added, Some(date("2025-01-10")));
        assert_eq!(coffee.expiry_date, Some(date("2026-01-01")));
        assert_eq!(coffee.name, "coffee");
        assert_eq!(rec.current_full_inventory[1].date_added, Some(date("2025-03-01")));
    }

    #[test]
    fn test_blank_name_does_not_abort() {
        let judgment = Judgment {
            items_added: vec![JudgedItem::new("  ", None), JudgedItem::new("Jam", None)],
            items_removed: vec![String::new()],
            current_full_inventory: vec![JudgedItem::new("Jam", None)],
        };
        let out = reconcile(PantryRecord::default(), &judgment, today());
        assert_eq!(out.record.items_added.len(), 1);
        assert!(out.record.items_removed.is_empty());
        assert_eq!(out.record.current_full_inventory.len(), 1);
        assert_eq!(out.dropped_names.len(), 2);
        assert_eq!(out.record.item_registry.len(), 1);
    }

    #[test]
    fn test_stored_names_trimmed_but_cased() {
        let judgment = Judgment {
            items_added: vec![JudgedItem::new("  Whole  Milk ", None)],
            items_removed: vec![" Rye Bread\n".to_string()],
            current_full_inventory: vec![JudgedItem::new("  Whole  Milk ", None)],
        };
        let rec = reconcile(PantryRecord::default(), &judgment, today()).record;

        assert_eq!(rec.items_added[0].name, "Whole  Milk");
        assert_eq!(rec.current_full_inventory[0].name, "Whole  Milk");
        assert_eq!(rec.items_removed[0].name, "Rye Bread");
        assert!(rec.item_registry.get("whole  milk").is_some());
    }
}
