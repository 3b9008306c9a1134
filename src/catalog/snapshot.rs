use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::models::ItemRecord;

/// An immutable, point-in-time view of every item record.
///
/// Items are ordered by id; that order is the tie-break for query sorts.
#[derive(Debug, Default)]
pub struct Snapshot {
    items: Vec<ItemRecord>,
    by_id: HashMap<i64, usize>,
    last_updated: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Build a snapshot. Duplicate ids collapse to the last occurrence.
    pub fn new(items: Vec<ItemRecord>, last_updated: Option<DateTime<Utc>>) -> Self {
        let keyed: BTreeMap<i64, ItemRecord> = items.into_iter().map(|i| (i.id, i)).collect();
        let items: Vec<ItemRecord> = keyed.into_values().collect();
        let by_id = items.iter().enumerate().map(|(idx, i)| (i.id, idx)).collect();
        Self {
            items,
            by_id,
            last_updated,
        }
    }

    pub fn items(&self) -> &[ItemRecord] {
        &self.items
    }

    pub fn get(&self, id: i64) -> Option<&ItemRecord> {
        self.by_id.get(&id).map(|idx| &self.items[*idx])
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// A new snapshot with `updates` laid over this one: same-id records are
    /// replaced, new ids are added, everything else is carried over.
    pub fn with_updates(&self, updates: Vec<ItemRecord>, last_updated: DateTime<Utc>) -> Snapshot {
        let mut keyed: BTreeMap<i64, ItemRecord> =
            self.items.iter().map(|i| (i.id, i.clone())).collect();
        for item in updates {
            keyed.insert(item.id, item);
        }
        Snapshot::new(keyed.into_values().collect(), Some(last_updated))
    }

    /// Distinct non-empty values of `rarity` and `type`, sorted.
    pub fn facets(&self) -> (Vec<String>, Vec<String>) {
        let mut rarities: Vec<String> = Vec::new();
        let mut types: Vec<String> = Vec::new();
        for item in &self.items {
            if let Some(r) = item.rarity.as_deref().filter(|r| !r.is_empty()) {
                rarities.push(r.to_string());
            }
            if let Some(t) = item.item_type.as_deref().filter(|t| !t.is_empty()) {
                types.push(t.to_string());
            }
        }
        rarities.sort();
        rarities.dedup();
        types.sort();
        types.dedup();
        (rarities, types)
    }
}

/// Holder of the current snapshot. Readers take a cheap `Arc` clone and keep
/// a consistent view for as long as they hold it; a refresh swaps in a whole
/// new snapshot at once.
#[derive(Debug, Default)]
pub struct Catalog {
    current: RwLock<Arc<Snapshot>>,
}

impl Catalog {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, snapshot: Snapshot) {
        let next = Arc::new(snapshot);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn named(id: i64, name: &str) -> ItemRecord {
        let mut item = ItemRecord::new(id);
        item.name = Some(name.into());
        item
    }

    #[test]
    fn test_items_are_ordered_and_indexed_by_id() {
        let snapshot = Snapshot::new(vec![named(30, "c"), named(10, "a"), named(20, "b")], None);
        let ids: Vec<i64> = snapshot.items().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
        assert_eq!(snapshot.get(20).and_then(|i| i.name.as_deref()), Some("b"));
        assert!(snapshot.get(99).is_none());
    }

    #[test]
    fn test_with_updates_keeps_untouched_records() {
        let base = Snapshot::new(vec![named(1, "one"), named(2, "two")], None);
        let mut changed = named(2, "TWO");
        changed.buy_price = Some(Decimal::from(5));
        let now = Utc::now();

        let next = base.with_updates(vec![changed, named(3, "three")], now);

        assert_eq!(next.len(), 3);
        assert_eq!(next.get(1).and_then(|i| i.name.as_deref()), Some("one"));
        assert_eq!(next.get(2).and_then(|i| i.name.as_deref()), Some("TWO"));
        assert_eq!(next.last_updated(), Some(now));
        // The base snapshot is untouched.
        assert_eq!(base.get(2).and_then(|i| i.name.as_deref()), Some("two"));
    }

    #[test]
    fn test_readers_keep_their_snapshot_across_a_swap() {
        let catalog = Catalog::new(Snapshot::new(vec![named(1, "old")], None));
        let held = catalog.snapshot();

        catalog.replace(Snapshot::new(vec![named(1, "new"), named(2, "extra")], None));

        assert_eq!(held.len(), 1);
        assert_eq!(held.get(1).and_then(|i| i.name.as_deref()), Some("old"));
        assert_eq!(catalog.snapshot().len(), 2);
    }

    #[test]
    fn test_facets_are_distinct_and_sorted() {
        let mut a = named(1, "a");
        a.rarity = Some("Rare".into());
        a.item_type = Some("Weapon".into());
        let mut b = named(2, "b");
        b.rarity = Some("Exotic".into());
        b.item_type = Some("Weapon".into());
        let c = named(3, "c");

        let (rarities, types) = Snapshot::new(vec![a, b, c], None).facets();
        assert_eq!(rarities, vec!["Exotic", "Rare"]);
        assert_eq!(types, vec!["Weapon"]);
    }
}
