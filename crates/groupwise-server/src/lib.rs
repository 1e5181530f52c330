#![forbid(unsafe_code)]

//! Axum service exposing the group comparison: `POST /anova` plus the
//! operational surface (health, readiness, metrics, version, OpenAPI).

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use tokio::sync::Semaphore;

mod config;
mod http;
mod telemetry;

pub use config::ApiConfig;
pub(crate) use telemetry::metrics::RequestMetrics;

pub const CRATE_NAME: &str = "groupwise-server";

#[derive(Clone)]
pub struct AppState {
    pub(crate) config: Arc<ApiConfig>,
    pub(crate) metrics: Arc<RequestMetrics>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
    pub(crate) ready: Arc<AtomicBool>,
    pub(crate) compare_workers: Arc<Semaphore>,
}

impl AppState {
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        let compare_workers = Arc::new(Semaphore::new(config.compare_workers));
        Self {
            config: Arc::new(config),
            metrics: Arc::new(RequestMetrics::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
            ready: Arc::new(AtomicBool::new(true)),
            compare_workers,
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, std::sync::atomic::Ordering::Relaxed);
    }
}

pub fn build_router(state: AppState) -> Router {
    // The layer limit sits above the configured ceiling so the handler can
    // answer over-limit bodies with the structured PayloadTooLarge error.
    let layer_limit = state.config.max_body_bytes.saturating_mul(2);
    Router::new()
        .route("/anova", post(http::handlers::anova_handler))
        .route("/healthz", get(http::handlers::healthz_handler))
        .route("/readyz", get(http::handlers::readyz_handler))
        .route("/metrics", get(telemetry::metrics::metrics_handler))
        .route("/v1/version", get(http::handlers::version_handler))
        .route("/v1/openapi.json", get(http::handlers::openapi_handler))
        .layer(DefaultBodyLimit::max(layer_limit))
        .with_state(state)
}
