//! Health check HTTP handlers

use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;

use crate::observability::StatsSnapshot;
use crate::web::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: i64,
    pub dedup_entries: usize,
    pub stats: StatsSnapshot,
}

/// Liveness plus tracker counters, so silent notification loss is visible
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: (chrono::Utc::now() - state.start_time).num_seconds(),
        dedup_entries: state.tracker.dedup().len(),
        stats: state.tracker.stats().snapshot(),
    })
}
