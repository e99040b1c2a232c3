use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::activity::ActivityLevel;
use crate::error::PanelError;
use crate::state::SharedState;

/// GET /api/runs — runs whose engine is still executing.
pub async fn list_active_runs(State(state): State<SharedState>) -> impl IntoResponse {
    let runs = state.active_runs().await;
    Json(serde_json::json!({
        "runs": runs,
        "count": runs.len(),
    }))
}

/// POST /api/runs/{id}/cancel — kill the engine for an in-flight run.
pub async fn cancel_run(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, PanelError> {
    state.cancel_run(&id).await?;

    state
        .activity
        .emit(Some(&id), ActivityLevel::Warn, "Cancellation requested")
        .await;

    Ok(Json(serde_json::json!({
        "status": "cancelling",
        "id": id,
    })))
}
