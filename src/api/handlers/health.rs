use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "items": state.catalog.snapshot().len(),
                "refreshIntervalSecs": state.config.refresh_interval_secs,
                "lastRefreshTime": state.refresher.last_refresh(),
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Record store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "store": "unreachable" })),
            )
        }
    }
}
