//! HTTP facade for Quarry: search, filtered search, ingestion and health.

pub mod config;
pub mod error;
pub mod routes;
pub mod seed;
pub mod state;
pub mod telemetry;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::ApiError;
pub use state::{AppState, Settings};

pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 64;

/// Request-level limits applied around every route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerLimits {
    pub body_limit: usize,
    pub concurrency_limit: usize,
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            body_limit: DEFAULT_BODY_LIMIT,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
        }
    }
}

pub fn app(state: AppState, limits: ServerLimits) -> Router {
    Router::new()
        .route("/api/search", get(routes::search))
        .route("/api/search/filtered", get(routes::search_filtered))
        .route("/api/documents", post(routes::add_documents))
        .route("/health", get(routes::health))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(limits.body_limit))
        .layer(GlobalConcurrencyLimitLayer::new(limits.concurrency_limit))
        .layer(TraceLayer::new_for_http())
}
