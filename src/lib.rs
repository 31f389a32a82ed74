pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod hub;
pub mod ingestion;
pub mod intelligence;
pub mod metrics;
pub mod models;
pub mod polymarket;

use std::sync::Arc;

use crate::db::AlertStore;
use crate::hub::BroadcastHub;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AlertStore>,
    pub hub: BroadcastHub,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
