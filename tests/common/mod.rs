use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::ServiceExt;

use tradepost::api::router::create_router;
use tradepost::catalog::{Catalog, Snapshot};
use tradepost::config::AppConfig;
use tradepost::db::{MemoryItemStore, RecordStore};
use tradepost::market::normalize::normalize_item;
use tradepost::market::{ItemSource, SourceError};
use tradepost::models::{ItemRecord, RawItem};
use tradepost::services::RefreshCoordinator;
use tradepost::AppState;

/// Market feed double. Serves `payload` or fails with a 503 when it is `None`.
/// Fixtures use the feed's own key spelling and are normalized like the real
/// client's output.
#[allow(dead_code)]
pub struct StubSource {
    payload: Mutex<Option<Vec<RawItem>>>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl StubSource {
    pub fn serving(items: Vec<Value>) -> Self {
        let items = items
            .into_iter()
            .map(|v| match v {
                Value::Object(map) => normalize_item(map),
                other => panic!("feed fixture must be an object, got {other}"),
            })
            .collect();
        Self {
            payload: Mutex::new(Some(items)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            payload: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ItemSource for StubSource {
    async fn fetch_items(&self) -> Result<Vec<RawItem>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payload
            .lock()
            .unwrap()
            .clone()
            .ok_or(SourceError::Status(503))
    }
}

/// An item with a name and optional trading-post prices.
#[allow(dead_code)]
pub fn priced_item(id: i64, name: &str, sell: Option<i64>, buy: Option<i64>) -> ItemRecord {
    let mut item = ItemRecord::new(id);
    item.name = Some(name.into());
    item.sell_price = sell.map(Decimal::from);
    item.buy_price = buy.map(Decimal::from);
    item
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub source: Arc<StubSource>,
    pub store: Arc<MemoryItemStore>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post(&self, uri: &str) -> Response<Body> {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }
}

/// Build the router over an in-memory store seeded with `items`.
///
/// `last_refresh` of `Some(now)` keeps request-triggered refreshes from firing.
#[allow(dead_code)]
pub async fn build_test_app(
    items: Vec<ItemRecord>,
    source: StubSource,
    last_refresh: Option<DateTime<Utc>>,
) -> TestApp {
    let store = Arc::new(MemoryItemStore::with_items(items.clone()).await);
    let catalog = Arc::new(Catalog::new(Snapshot::new(items, None)));
    let source = Arc::new(source);

    let config = AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        ..AppConfig::default()
    };

    let store_dyn: Arc<dyn RecordStore> = store.clone();
    let refresher = Arc::new(
        RefreshCoordinator::new(
            source.clone(),
            store_dyn.clone(),
            catalog.clone(),
            config.refresh_interval_secs,
            config.refresh_batch_size,
        )
        .with_last_refresh(last_refresh),
    );

    let state = AppState {
        catalog,
        refresher,
        store: store_dyn,
        config,
        metrics_handle: tradepost::metrics::detached_handle(),
    };

    TestApp {
        router: create_router(state.clone()),
        state,
        source,
        store,
    }
}

#[allow(dead_code)]
pub async fn body_json(resp: Response<Body>) -> Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Connect to the Postgres test database and run all migrations, or `None`
/// when `TEST_DATABASE_URL` is unset.
#[allow(dead_code)]
pub async fn setup_test_db() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Clean tables for test isolation
    sqlx::query("DELETE FROM items").execute(&pool).await.ok();
    sqlx::query("DELETE FROM store_metadata").execute(&pool).await.ok();

    Some(pool)
}
