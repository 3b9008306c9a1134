use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use thiserror::Error;

use super::normalize::{feed_key, normalize_item};
use crate::config::DEFAULT_MARKET_API_URL;
use crate::models::RawItem;
use crate::query::fields::NUMBER_FIELDS;

/// Descriptive (non-numeric) fields requested from the feed, canonical names.
const DESCRIPTIVE_FIELDS: [&str; 12] = [
    "id",
    "name",
    "charm",
    "img",
    "rarity",
    "chat_link",
    "level",
    "type",
    "first_added",
    "stat_name",
    "upgrade_name",
    "weapon_type",
];

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("market feed returned status {0}")]
    Status(u16),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

/// The remote market-data feed: one call returns every item.
#[async_trait]
pub trait ItemSource: Send + Sync {
    async fn fetch_items(&self) -> Result<Vec<RawItem>, SourceError>;
}

#[derive(Debug, Clone)]
pub struct DataWarsClient {
    http: Client,
    base_url: String,
}

impl Default for DataWarsClient {
    fn default() -> Self {
        Self::new(Client::new(), DEFAULT_MARKET_API_URL)
    }
}

impl DataWarsClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, SourceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self::new(http, base_url))
    }
}

/// Comma-separated `fields=` value: descriptive fields, then every stored
/// numeric field, all spelled the way the feed expects.
pub fn requested_fields() -> String {
    let mut fields: Vec<String> = DESCRIPTIVE_FIELDS.iter().map(|f| feed_key(f)).collect();
    fields.push(feed_key("last_update"));
    for field in NUMBER_FIELDS.iter().filter(|f| !f.derived) {
        if DESCRIPTIVE_FIELDS.contains(&field.name) {
            continue;
        }
        fields.push(feed_key(field.name));
    }
    fields.join(",")
}

/// Turn the feed's JSON body into normalized records.
pub fn parse_feed(body: Value) -> Result<Vec<RawItem>, SourceError> {
    let Value::Array(entries) = body else {
        return Err(SourceError::Unexpected("expected a JSON array of items".into()));
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            Value::Object(map) => Ok(normalize_item(map)),
            other => Err(SourceError::Unexpected(format!(
                "entry {index} is not an object: {other}"
            ))),
        })
        .collect()
}

#[async_trait]
impl ItemSource for DataWarsClient {
    async fn fetch_items(&self) -> Result<Vec<RawItem>, SourceError> {
        let fields = requested_fields();
        let url = Url::parse_with_params(
            &self.base_url,
            &[("fields", fields.as_str()), ("beautify", "min")],
        )
        .map_err(|e| SourceError::Unexpected(format!("invalid feed URL {}: {e}", self.base_url)))?;

        let resp = self.http.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body: Value = resp.json().await?;
        let items = parse_feed(body)?;

        tracing::debug!(items = items.len(), "Fetched market feed");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_requested_fields_use_feed_spelling() {
        let fields = requested_fields();
        let list: Vec<&str> = fields.split(',').collect();

        assert_eq!(list[0], "id");
        assert!(list.contains(&"weaponType"));
        assert!(list.contains(&"lastUpdate"));
        assert!(list.contains(&"1d_sell_sold"));
        assert!(list.contains(&"1m_sell_delisted_value"));
        assert!(list.contains(&"buy_price"));
        assert!(!list.contains(&"profit"));
        assert_eq!(list.iter().filter(|f| **f == "id").count(), 1);
        assert_eq!(list.iter().filter(|f| **f == "level").count(), 1);
    }

    #[test]
    fn test_parse_feed_normalizes_entries() {
        let items = parse_feed(json!([
            { "id": 1, "1d_sell_sold": 5 },
            { "id": 2, "firstAdded": "2012-08-28" },
        ]))
        .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].get("one_d_sell_sold"), Some(&json!(5)));
        assert_eq!(items[1].get("first_added"), Some(&json!("2012-08-28")));
    }

    #[test]
    fn test_parse_feed_rejects_non_array() {
        assert!(matches!(
            parse_feed(json!({ "error": "rate limited" })),
            Err(SourceError::Unexpected(_))
        ));
        assert!(matches!(
            parse_feed(json!([1, 2])),
            Err(SourceError::Unexpected(_))
        ));
    }
}
