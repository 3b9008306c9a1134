use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::{ItemRecord, RawItem};

/// One record or batch that could not be merged or persisted during a
/// refresh. Failures are collected; they never abort the rest of the refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeFailure {
    pub item_id: Option<i64>,
    pub batch: Option<usize>,
    pub reason: String,
}

impl MergeFailure {
    pub fn record(item_id: Option<i64>, reason: impl Into<String>) -> Self {
        Self {
            item_id,
            batch: None,
            reason: reason.into(),
        }
    }

    pub fn batch(batch: usize, reason: impl Into<String>) -> Self {
        Self {
            item_id: None,
            batch: Some(batch),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for MergeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.item_id, self.batch) {
            (_, Some(batch)) => write!(f, "batch {batch}: {}", self.reason),
            (Some(id), None) => write!(f, "item {id}: {}", self.reason),
            (None, None) => f.write_str(&self.reason),
        }
    }
}

impl std::error::Error for MergeFailure {}

/// The id an incoming record claims, if it is a positive integer.
pub fn incoming_id(raw: &RawItem) -> Option<i64> {
    let id = match raw.get("id")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    id.filter(|id| *id > 0)
}

/// Shallow overlay of `incoming` onto `prior`: every key present in
/// `incoming` wins (an explicit `null` included), every other key keeps its
/// prior value.
pub fn overlay(prior: Option<&ItemRecord>, incoming: &RawItem) -> Result<ItemRecord, MergeFailure> {
    let Some(id) = incoming_id(incoming) else {
        return Err(MergeFailure::record(
            None,
            format!("missing or invalid id: {}", incoming.get("id").unwrap_or(&Value::Null)),
        ));
    };

    let mut merged: Map<String, Value> = match prior {
        Some(prior) => match serde_json::to_value(prior) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => return Err(MergeFailure::record(Some(id), e.to_string())),
        },
        None => Map::new(),
    };

    for (key, value) in incoming {
        merged.insert(key.clone(), value.clone());
    }
    merged.insert("id".into(), Value::from(id));

    serde_json::from_value(Value::Object(merged))
        .map_err(|e| MergeFailure::record(Some(id), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn raw(value: Value) -> RawItem {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_incoming_wins_and_missing_keys_survive() {
        let mut prior = ItemRecord::new(5);
        prior.buy_price = Some(Decimal::from(1));
        prior.sell_price = Some(Decimal::from(2));
        prior.name = Some("Old name".into());

        let merged = overlay(Some(&prior), &raw(json!({ "id": 5, "buy_price": 9 }))).unwrap();

        assert_eq!(merged.buy_price, Some(Decimal::from(9)));
        assert_eq!(merged.sell_price, Some(Decimal::from(2)));
        assert_eq!(merged.name.as_deref(), Some("Old name"));
    }

    #[test]
    fn test_explicit_null_overrides() {
        let mut prior = ItemRecord::new(5);
        prior.sell_price = Some(Decimal::from(2));

        let merged = overlay(Some(&prior), &raw(json!({ "id": 5, "sell_price": null }))).unwrap();
        assert_eq!(merged.sell_price, None);
    }

    #[test]
    fn test_unknown_prior_keys_survive() {
        let mut prior = ItemRecord::new(5);
        prior.extra.insert("vendor_value".into(), json!(12));

        let merged = overlay(Some(&prior), &raw(json!({ "id": 5 }))).unwrap();
        assert_eq!(merged.extra.get("vendor_value"), Some(&json!(12)));
    }

    #[test]
    fn test_new_record_without_prior() {
        let merged = overlay(None, &raw(json!({ "id": "77", "name": "Fresh" }))).unwrap();
        assert_eq!(merged.id, 77);
        assert_eq!(merged.name.as_deref(), Some("Fresh"));
    }

    #[test]
    fn test_invalid_records_fail_individually() {
        let no_id = overlay(None, &raw(json!({ "name": "x" }))).unwrap_err();
        assert_eq!(no_id.item_id, None);

        let negative = overlay(None, &raw(json!({ "id": -3 }))).unwrap_err();
        assert_eq!(negative.item_id, None);

        let bad_price = overlay(None, &raw(json!({ "id": 3, "buy_price": "lots" }))).unwrap_err();
        assert_eq!(bad_price.item_id, Some(3));
    }
}
