use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::exporter::Exporter;
use crate::handlers;
use crate::middleware::timing;

/// Shared state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    pub exporter: Exporter,
}

/// Builds the Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Scrape ──────────────────────────────────────────────
        .route("/api/scrape", get(handlers::scrape::scrape))
        // ── Health / self-monitoring ────────────────────────────
        .route("/api/health", get(handlers::health::health))
        .route("/api/stats", get(handlers::health::stats))
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(CorsLayer::permissive())
}
