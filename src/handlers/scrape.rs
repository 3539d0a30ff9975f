use axum::{extract::State, Json};
use std::sync::Arc;

use crate::exporter::ScrapeReport;
use crate::server::AppState;

// ─── GET /api/scrape ─────────────────────────────────────────────
/// Runs one scrape of every family (cache permitting) and returns the
/// samples as JSON. Overlapping requests are absorbed by the family caches.
pub async fn scrape(State(state): State<Arc<AppState>>) -> Json<ScrapeReport> {
    Json(state.exporter.scrape().await)
}
