use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the cache root accepts new artifacts.
    pub cache_writable: bool,
}

/// GET /health -- returns service and cache health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let cache_writable = state.cache.is_writable().await;

    // An unwritable cache still serves thumbnails, just without caching.
    let status = if cache_writable { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        cache_writable,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
