use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use super::{MetaKey, RecordStore};
use crate::models::ItemRecord;

/// Postgres-backed record store. Each item is one JSONB document; an upsert
/// merges with `||`, so keys the incoming record lacks keep their stored value.
#[derive(Debug, Clone)]
pub struct PgItemStore {
    pool: PgPool,
}

impl PgItemStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for PgItemStore {
    async fn load_items(&self) -> anyhow::Result<Vec<ItemRecord>> {
        let rows: Vec<(Json<ItemRecord>,)> =
            sqlx::query_as("SELECT data FROM items ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(Json(item),)| item).collect())
    }

    async fn upsert_items(&self, items: &[ItemRecord]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO items (id, data, updated_at)
                VALUES ($1, $2, NOW())
                ON CONFLICT (id) DO UPDATE
                SET data = items.data || EXCLUDED.data,
                    updated_at = NOW()
                "#,
            )
            .bind(item.id)
            .bind(Json(item))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_meta(&self, key: MetaKey) -> anyhow::Result<Option<DateTime<Utc>>> {
        let row: Option<(DateTime<Utc>,)> =
            sqlx::query_as("SELECT value FROM store_metadata WHERE key = $1")
                .bind(key.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|r| r.0))
    }

    async fn set_meta(&self, key: MetaKey, value: DateTime<Utc>) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO store_metadata (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(key.as_str())
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
