use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let ops = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    let api = Router::new()
        .route("/api/items", get(handlers::items::list))
        .route("/api/items/facets", get(handlers::items::facets))
        .route("/api/items/:id", get(handlers::items::detail))
        .route("/api/update-database", post(handlers::refresh::update_database));

    // The UI may be served from anywhere.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    ops.merge(api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
