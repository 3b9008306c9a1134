pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod derived;
pub mod errors;
pub mod market;
pub mod metrics;
pub mod models;
pub mod query;
pub mod services;

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::db::RecordStore;
use crate::services::RefreshCoordinator;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub refresher: Arc<RefreshCoordinator>,
    pub store: Arc<dyn RecordStore>,
    pub config: AppConfig,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
