use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{MetaKey, RecordStore};
use crate::catalog::overlay;
use crate::models::ItemRecord;

/// Process-local record store. Used when no database is configured and by the
/// test suite; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryItemStore {
    items: RwLock<BTreeMap<i64, ItemRecord>>,
    meta: RwLock<HashMap<MetaKey, DateTime<Utc>>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_items(items: Vec<ItemRecord>) -> Self {
        let store = Self::new();
        {
            let mut stored = store.items.write().await;
            for item in items {
                stored.insert(item.id, item);
            }
        }
        store
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }
}

#[async_trait]
impl RecordStore for MemoryItemStore {
    async fn load_items(&self) -> anyhow::Result<Vec<ItemRecord>> {
        Ok(self.items.read().await.values().cloned().collect())
    }

    async fn upsert_items(&self, items: &[ItemRecord]) -> anyhow::Result<()> {
        // Merge the whole batch before touching the map so a bad record
        // leaves the store unchanged.
        let mut stored = self.items.write().await;
        let mut merged = Vec::with_capacity(items.len());
        for item in items {
            let incoming = match serde_json::to_value(item)? {
                serde_json::Value::Object(map) => map,
                _ => anyhow::bail!("item {} did not serialize to an object", item.id),
            };
            merged.push(overlay(stored.get(&item.id), &incoming)?);
        }
        for item in merged {
            stored.insert(item.id, item);
        }
        Ok(())
    }

    async fn get_meta(&self, key: MetaKey) -> anyhow::Result<Option<DateTime<Utc>>> {
        Ok(self.meta.read().await.get(&key).copied())
    }

    async fn set_meta(&self, key: MetaKey, value: DateTime<Utc>) -> anyhow::Result<()> {
        self.meta.write().await.insert(key, value);
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
