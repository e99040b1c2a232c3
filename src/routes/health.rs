use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub k6_bin: String,
    pub data_dir: String,
    pub active_runs: usize,
}

/// GET /health
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let active_runs = state.runs.read().await.len();

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        k6_bin: state.config.k6_bin.display().to_string(),
        data_dir: state.config.data_dir.display().to_string(),
        active_runs,
    })
}
