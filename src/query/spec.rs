use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::fields::{number_field, Field, NumberField, TextField};
use super::QueryError;

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_LIMIT: usize = 20;

/// Query-string keys with a fixed meaning; anything else may be a range filter.
const RESERVED_PARAMS: [&str; 7] = [
    "page",
    "limit",
    "search",
    "sortKey",
    "sortDirection",
    "rarity",
    "type",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Anything other than `desc` (case-insensitive) sorts ascending.
    pub fn from_param(s: &str) -> Self {
        if s.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// Inclusive bounds on one numeric field. A missing bound is open.
#[derive(Debug, Clone, Copy)]
pub struct RangeFilter {
    pub field: NumberField,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

impl RangeFilter {
    /// Parse a `"min,max"` pair. Empty or non-numeric bounds are dropped
    /// rather than failing the query; `None` when neither bound survives.
    pub fn parse(field: NumberField, raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(2, ',');
        let min = parts.next().and_then(parse_bound);
        let max = parts.next().and_then(parse_bound);
        if min.is_none() && max.is_none() {
            return None;
        }
        Some(Self { field, min, max })
    }

    /// A null field value never satisfies a bounded filter.
    pub fn matches(&self, value: Option<Decimal>) -> bool {
        let Some(value) = value else {
            return false;
        };
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

fn parse_bound(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// A declarative item query.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub page: usize,
    pub limit: usize,
    pub search: Option<String>,
    pub rarity: Option<String>,
    pub item_type: Option<String>,
    pub range_filters: Vec<RangeFilter>,
    pub sort_key: Field,
    pub sort_direction: SortDirection,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            search: None,
            rarity: None,
            item_type: None,
            range_filters: Vec::new(),
            sort_key: Field::Text(TextField::Name),
            sort_direction: SortDirection::Asc,
        }
    }
}

impl QuerySpec {
    /// Build a spec from raw query-string parameters.
    ///
    /// Pagination values must be integers >= 1. Everything else degrades
    /// gracefully: an unknown sort key falls back to `name`, unknown filter
    /// keys are ignored, and malformed range bounds are not applied.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, QueryError> {
        let mut spec = QuerySpec {
            page: parse_positive(params, "page", DEFAULT_PAGE)?,
            limit: parse_positive(params, "limit", DEFAULT_LIMIT)?,
            search: non_empty(params.get("search")),
            rarity: non_empty(params.get("rarity")),
            item_type: non_empty(params.get("type")),
            ..QuerySpec::default()
        };

        if let Some(key) = non_empty(params.get("sortKey")) {
            match Field::lookup(&key) {
                Some(field) => spec.sort_key = field,
                None => tracing::debug!(sort_key = %key, "Unknown sort key, sorting by name"),
            }
        }
        if let Some(direction) = params.get("sortDirection") {
            spec.sort_direction = SortDirection::from_param(direction);
        }

        // Sorted for a deterministic filter order in logs and tests.
        let mut keys: Vec<&String> = params
            .keys()
            .filter(|k| !RESERVED_PARAMS.contains(&k.as_str()))
            .collect();
        keys.sort();

        for key in keys {
            let Some(field) = number_field(key) else {
                continue;
            };
            if let Some(filter) = RangeFilter::parse(field, &params[key]) {
                spec.range_filters.push(filter);
            }
        }

        Ok(spec)
    }

    pub fn with_range(mut self, name: &str, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        if let Some(field) = number_field(name) {
            self.range_filters.push(RangeFilter { field, min, max });
        }
        self
    }

    pub fn sorted_by(mut self, name: &str, direction: SortDirection) -> Self {
        if let Some(field) = Field::lookup(name) {
            self.sort_key = field;
        }
        self.sort_direction = direction;
        self
    }
}

fn parse_positive(
    params: &HashMap<String, String>,
    key: &str,
    default: usize,
) -> Result<usize, QueryError> {
    let Some(raw) = params.get(key).map(|s| s.trim()).filter(|s| !s.is_empty()) else {
        return Ok(default);
    };
    match raw.parse::<i64>() {
        Ok(n) if n >= 1 => Ok(n as usize),
        Ok(n) => Err(QueryError::InvalidQuery(format!("{key} must be at least 1, got {n}"))),
        Err(_) => Err(QueryError::InvalidQuery(format!("{key} must be an integer, got {raw:?}"))),
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty()).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let spec = QuerySpec::from_params(&HashMap::new()).unwrap();
        assert_eq!(spec.page, 1);
        assert_eq!(spec.limit, 20);
        assert_eq!(spec.sort_key.name(), "name");
        assert_eq!(spec.sort_direction, SortDirection::Asc);
        assert!(spec.range_filters.is_empty());
    }

    #[test]
    fn test_full_parameter_set() {
        let spec = QuerySpec::from_params(&params(&[
            ("page", "3"),
            ("limit", "50"),
            ("search", "ecto"),
            ("sortKey", "roi"),
            ("sortDirection", "desc"),
            ("rarity", "Exotic"),
            ("type", "Weapon"),
            ("buy_price", "100,5000"),
            ("one_d_sell_sold", ",20"),
        ]))
        .unwrap();

        assert_eq!(spec.page, 3);
        assert_eq!(spec.limit, 50);
        assert_eq!(spec.search.as_deref(), Some("ecto"));
        assert_eq!(spec.rarity.as_deref(), Some("Exotic"));
        assert_eq!(spec.item_type.as_deref(), Some("Weapon"));
        assert_eq!(spec.sort_key.name(), "roi");
        assert_eq!(spec.sort_direction, SortDirection::Desc);

        assert_eq!(spec.range_filters.len(), 2);
        let buy = &spec.range_filters[0];
        assert_eq!(buy.field.name, "buy_price");
        assert_eq!(buy.min, Some(Decimal::from(100)));
        assert_eq!(buy.max, Some(Decimal::from(5000)));
        let sold = &spec.range_filters[1];
        assert_eq!(sold.field.name, "one_d_sell_sold");
        assert_eq!(sold.min, None);
        assert_eq!(sold.max, Some(Decimal::from(20)));
    }

    #[test]
    fn test_invalid_pagination_is_rejected() {
        for (key, value) in [("limit", "0"), ("limit", "-5"), ("page", "0"), ("page", "two")] {
            let result = QuerySpec::from_params(&params(&[(key, value)]));
            assert!(
                matches!(result, Err(QueryError::InvalidQuery(_))),
                "{key}={value} should be rejected"
            );
        }
    }

    #[test]
    fn test_malformed_bound_is_ignored() {
        let spec = QuerySpec::from_params(&params(&[("sell_price", "abc,900")])).unwrap();
        assert_eq!(spec.range_filters.len(), 1);
        assert_eq!(spec.range_filters[0].min, None);
        assert_eq!(spec.range_filters[0].max, Some(Decimal::from(900)));

        let spec = QuerySpec::from_params(&params(&[("sell_price", "abc,xyz")])).unwrap();
        assert!(spec.range_filters.is_empty());
    }

    #[test]
    fn test_unknown_keys_and_text_fields_are_not_range_filters() {
        let spec = QuerySpec::from_params(&params(&[
            ("expected_profit", "1,2"),
            ("name", "1,2"),
            ("utm_source", "x"),
        ]))
        .unwrap();
        assert!(spec.range_filters.is_empty());
    }

    #[test]
    fn test_unknown_sort_key_falls_back_to_name() {
        let spec = QuerySpec::from_params(&params(&[("sortKey", "bogus")])).unwrap();
        assert_eq!(spec.sort_key.name(), "name");
    }

    #[test]
    fn test_range_matches_bounds_inclusively_and_rejects_null() {
        let field = number_field("buy_price").unwrap();
        let filter = RangeFilter::parse(field, "100,200").unwrap();
        assert!(filter.matches(Some(Decimal::from(100))));
        assert!(filter.matches(Some(Decimal::from(200))));
        assert!(!filter.matches(Some(Decimal::from(201))));
        assert!(!filter.matches(None));

        let open_max = RangeFilter::parse(field, "100,").unwrap();
        assert!(open_max.matches(Some(Decimal::from(1_000_000))));
        assert!(!open_max.matches(None));
    }
}
