use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use metrics::gauge;

use crate::AppState;

/// Prometheus scrape endpoint. The catalog size gauge is sampled at scrape
/// time so it is right even before the first refresh.
pub async fn render(State(state): State<AppState>) -> impl IntoResponse {
    gauge!("catalog_items").set(state.catalog.snapshot().len() as f64);
    let body = state.metrics_handle.render();
    ([(CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}
