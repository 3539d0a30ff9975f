use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::metrics::StatsSnapshot;
use crate::server::AppState;
use crate::up::ReadinessReport;

// ─── GET /api/health ─────────────────────────────────────────────
/// Drains each family's up-signal once. 200 when every family's last
/// scrape was healthy, 503 otherwise.
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessReport>) {
    let report = state.exporter.readiness().poll();
    let status = if report.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

// ─── GET /api/stats ──────────────────────────────────────────────

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsSnapshot> {
    Json(state.exporter.stats())
}
