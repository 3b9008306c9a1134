use std::collections::HashMap;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use metrics::{counter, histogram};
use serde::Serialize;

use crate::derived::ItemView;
use crate::errors::AppError;
use crate::query::{run_query, QuerySpec};
use crate::AppState;

/// `GET /api/items`: filter, sort and paginate the current snapshot.
///
/// Kicks off a background refresh when one is due; the response is always
/// served from the snapshot in place when the request arrived.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let started = Instant::now();
    let spec = QuerySpec::from_params(&params)?;

    state.refresher.trigger_in_background(Utc::now());

    let snapshot = state.catalog.snapshot();
    let page = run_query(snapshot.items(), &spec, snapshot.last_updated())?;

    counter!("item_queries_total").increment(1);
    histogram!("query_latency_seconds").record(started.elapsed().as_secs_f64());
    tracing::debug!(
        total_items = page.total_items,
        page = page.current_page,
        sort = spec.sort_key.name(),
        "Served item query"
    );

    Ok(Json(page).into_response())
}

/// `GET /api/items/:id`. An id that is not an integer cannot match a record,
/// so it is a not-found like any other.
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let snapshot = state.catalog.snapshot();
    let item = id
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|id| snapshot.get(id))
        .ok_or_else(|| AppError::NotFound("Item not found".into()))?;

    Ok(Json(ItemView::new(item)).into_response())
}

#[derive(Serialize)]
pub struct Facets {
    pub rarities: Vec<String>,
    pub types: Vec<String>,
}

/// `GET /api/items/facets`: the values the rarity and type filters accept.
pub async fn facets(State(state): State<AppState>) -> Json<Facets> {
    let (rarities, types) = state.catalog.snapshot().facets();
    Json(Facets { rarities, types })
}
