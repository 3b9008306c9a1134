use std::sync::Arc;

use tradepost::api::router::create_router;
use tradepost::catalog::{Catalog, Snapshot};
use tradepost::config::AppConfig;
use tradepost::db::{self, MemoryItemStore, MetaKey, PgItemStore, RecordStore};
use tradepost::market::DataWarsClient;
use tradepost::services::RefreshCoordinator;
use tradepost::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let metrics_handle = tradepost::metrics::init_metrics()?;

    let store: Arc<dyn RecordStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::init_pool(url).await?;
            tracing::info!("Database connected");
            Arc::new(PgItemStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; item records are kept in memory only");
            Arc::new(MemoryItemStore::new())
        }
    };

    let items = store.load_items().await?;
    let last_updated = store.get_meta(MetaKey::LastUpdated).await?;
    tracing::info!(items = items.len(), ?last_updated, "Loaded item catalog");
    let catalog = Arc::new(Catalog::new(Snapshot::new(items, last_updated)));

    let source = Arc::new(DataWarsClient::with_timeout(
        config.market_api_url.clone(),
        config.market_api_timeout_secs,
    )?);
    let refresher = Arc::new(
        RefreshCoordinator::restore(
            source,
            store.clone(),
            catalog.clone(),
            config.refresh_interval_secs,
            config.refresh_batch_size,
        )
        .await,
    );

    if config.refresh_on_startup {
        refresher.trigger_in_background(chrono::Utc::now());
    }

    if config.refresh_loop_enabled {
        let looped = refresher.clone();
        let tick_secs = looped.loop_tick().as_secs();
        tokio::spawn(async move {
            looped.run_refresh_loop().await;
        });
        tracing::info!(
            interval_secs = config.refresh_interval_secs,
            tick_secs,
            "Scheduled refresh loop spawned"
        );
    }

    let state = AppState {
        catalog,
        refresher,
        store,
        config,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
