use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::fields::FieldValue;
use super::spec::{QuerySpec, SortDirection};
use super::QueryError;
use crate::derived::ItemView;
use crate::models::ItemRecord;

/// One page of query results plus the metadata the UI paginates with.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage<'a> {
    pub items: Vec<ItemView<'a>>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Run a query over one snapshot: filter, sort, paginate.
///
/// Pure and synchronous. Records keep their snapshot order when sort keys tie.
pub fn run_query<'a>(
    items: &'a [ItemRecord],
    spec: &QuerySpec,
    last_updated: Option<DateTime<Utc>>,
) -> Result<QueryPage<'a>, QueryError> {
    if spec.limit == 0 {
        return Err(QueryError::InvalidQuery("limit must be at least 1".into()));
    }
    if spec.page == 0 {
        return Err(QueryError::InvalidQuery("page must be at least 1".into()));
    }

    let needle = spec.search.as_ref().map(|s| s.to_lowercase());

    let mut matched: Vec<(Option<FieldValue<'a>>, &'a ItemRecord)> = items
        .iter()
        .filter(|item| matches_search(item, needle.as_deref()))
        .filter(|item| matches_exact(item.rarity.as_deref(), spec.rarity.as_deref()))
        .filter(|item| matches_exact(item.item_type.as_deref(), spec.item_type.as_deref()))
        .filter(|item| {
            spec.range_filters
                .iter()
                .all(|filter| filter.matches((filter.field.get)(item)))
        })
        .map(|item| (spec.sort_key.value(item), item))
        .collect();

    // `sort_by` is stable, so equal keys keep snapshot order.
    matched.sort_by(|(a, _), (b, _)| compare_keys(a.as_ref(), b.as_ref(), spec.sort_direction));

    let total_items = matched.len();
    let total_pages = total_items.div_ceil(spec.limit);

    let start = (spec.page - 1).saturating_mul(spec.limit).min(total_items);
    let end = start.saturating_add(spec.limit).min(total_items);

    let page_items = matched[start..end]
        .iter()
        .map(|(_, item)| ItemView::new(*item))
        .collect();

    Ok(QueryPage {
        items: page_items,
        current_page: spec.page,
        total_pages,
        total_items,
        last_updated,
    })
}

fn matches_search(item: &ItemRecord, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(needle) => item
            .name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains(needle)),
    }
}

fn matches_exact(value: Option<&str>, wanted: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => value == Some(wanted),
    }
}

/// Missing values sort last in both directions.
fn compare_keys(
    a: Option<&FieldValue<'_>>,
    b: Option<&FieldValue<'_>>,
    direction: SortDirection,
) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ordering = compare_values(a, b);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
    }
}

fn compare_values(a: &FieldValue<'_>, b: &FieldValue<'_>) -> Ordering {
    match (a, b) {
        (FieldValue::Number(a), FieldValue::Number(b)) => a.cmp(b),
        (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
        // A field resolves to one variant for every item; keep this total anyway.
        (FieldValue::Number(_), FieldValue::Text(_)) => Ordering::Less,
        (FieldValue::Text(_), FieldValue::Number(_)) => Ordering::Greater,
    }
}
