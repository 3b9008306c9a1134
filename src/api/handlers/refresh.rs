use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::catalog::MergeFailure;
use crate::errors::AppError;
use crate::services::RefreshError;
use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshSummary {
    message: String,
    items_processed: usize,
    items_committed: usize,
    duration_seconds: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PartialRefresh {
    error: String,
    failed_count: usize,
    items_committed: usize,
    details: Vec<MergeFailure>,
}

/// `POST /api/update-database`: refresh now, ignoring the interval.
pub async fn update_database(State(state): State<AppState>) -> Result<Response, AppError> {
    let report = match state.refresher.refresh_now(Utc::now()).await {
        Ok(report) => report,
        Err(RefreshError::NothingCommitted(failures)) => return Ok(failed_items(0, failures)),
        Err(e) => return Err(e.into()),
    };

    if report.is_partial() {
        return Ok(failed_items(report.items_committed, report.failures));
    }

    Ok(Json(RefreshSummary {
        message: "Database updated successfully".into(),
        items_processed: report.items_processed,
        items_committed: report.items_committed,
        duration_seconds: report.duration_seconds,
    })
    .into_response())
}

fn failed_items(items_committed: usize, failures: Vec<MergeFailure>) -> Response {
    let body = PartialRefresh {
        error: "Some items failed to update".into(),
        failed_count: failures.len(),
        items_committed,
        details: failures,
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
