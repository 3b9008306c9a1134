use std::env;

pub const DEFAULT_MARKET_API_URL: &str = "https://api.datawars2.ie/gw2/v1/items/json";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres URL. When unset the service keeps its records in memory only.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,

    // Remote market-data feed
    pub market_api_url: String,
    pub market_api_timeout_secs: u64,

    // Refresh
    pub refresh_interval_secs: u64,
    pub refresh_batch_size: usize,
    pub refresh_loop_enabled: bool,
    pub refresh_on_startup: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            host: "0.0.0.0".into(),
            port: 8080,
            market_api_url: DEFAULT_MARKET_API_URL.into(),
            market_api_timeout_secs: 30,
            refresh_interval_secs: 3_600,
            refresh_batch_size: 100,
            refresh_loop_enabled: false,
            refresh_on_startup: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let refresh_batch_size: usize = match lookup("REFRESH_BATCH_SIZE") {
            Some(v) => v.parse()?,
            None => defaults.refresh_batch_size,
        };
        if refresh_batch_size == 0 {
            anyhow::bail!("REFRESH_BATCH_SIZE must be at least 1");
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|s| !s.trim().is_empty()),
            host: lookup("HOST").unwrap_or(defaults.host),
            port: match lookup("PORT") {
                Some(v) => v.parse()?,
                None => defaults.port,
            },

            market_api_url: lookup("MARKET_API_URL").unwrap_or(defaults.market_api_url),
            market_api_timeout_secs: match lookup("MARKET_API_TIMEOUT_SECS") {
                Some(v) => v.parse()?,
                None => defaults.market_api_timeout_secs,
            },

            refresh_interval_secs: match lookup("REFRESH_INTERVAL_SECS") {
                Some(v) => v.parse()?,
                None => defaults.refresh_interval_secs,
            },
            refresh_batch_size,
            refresh_loop_enabled: lookup("REFRESH_LOOP_ENABLED")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.refresh_loop_enabled),
            refresh_on_startup: lookup("REFRESH_ON_STARTUP")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.refresh_on_startup),
        })
    }
}
