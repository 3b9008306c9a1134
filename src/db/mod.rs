pub mod item_repo;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::models::ItemRecord;

pub use item_repo::PgItemStore;
pub use memory::MemoryItemStore;

/// Bookkeeping timestamps kept next to the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaKey {
    /// When the item snapshot was last rewritten.
    LastUpdated,
    /// When the last successful refresh ran.
    LastRefreshTime,
}

impl MetaKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaKey::LastUpdated => "last_updated",
            MetaKey::LastRefreshTime => "last_refresh_time",
        }
    }
}

/// Durable home of the item records and their bookkeeping timestamps.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every stored record.
    async fn load_items(&self) -> anyhow::Result<Vec<ItemRecord>>;

    /// Upsert one batch atomically: either every record in `items` is written
    /// or none is. Existing records are overlaid, never truncated.
    async fn upsert_items(&self, items: &[ItemRecord]) -> anyhow::Result<()>;

    async fn get_meta(&self, key: MetaKey) -> anyhow::Result<Option<DateTime<Utc>>>;

    async fn set_meta(&self, key: MetaKey, value: DateTime<Utc>) -> anyhow::Result<()>;

    /// Cheap liveness probe for health checks.
    async fn ping(&self) -> anyhow::Result<()>;
}

pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
