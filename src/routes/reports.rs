use axum::extract::{Path, State};
use axum::Json;
use tracing::error;

use crate::error::PanelError;
use crate::report::{Report, ReportListing};
use crate::state::SharedState;

/// GET /api/reports — stored reports, newest first.
pub async fn list_reports(
    State(state): State<SharedState>,
) -> Result<Json<Vec<ReportListing>>, PanelError> {
    state.store.list().await.map(Json).map_err(|e| {
        error!("Error fetching reports: {}", e);
        PanelError::Other("Failed to fetch reports".into())
    })
}

/// GET /api/reports/{id} — one full report.
pub async fn get_report(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Report>, PanelError> {
    match state.store.get(&id).await {
        Ok(report) => Ok(Json(report)),
        Err(e @ PanelError::NotFound(_)) => Err(e),
        Err(e) => {
            error!("Error fetching report {}: {}", id, e);
            Err(PanelError::Other("Failed to fetch report".into()))
        }
    }
}
