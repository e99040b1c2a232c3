use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header;
use axum::response::Response;
use std::convert::Infallible;
use tokio::sync::oneshot;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::error::PanelError;
use crate::run_config::RunConfig;
use crate::state::SharedState;

pub const RUN_ID_HEADER: &str = "x-run-id";

/// POST /api/run-test — start a k6 run and stream its console output.
///
/// The body is decoded by hand so malformed JSON comes back as the usual
/// `{"error", "details"}` shape instead of an extractor rejection.
pub async fn run_test(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Response, PanelError> {
    let config = RunConfig::from_json(&body)?;

    let (cancel_tx, cancel_rx) = oneshot::channel();
    let handle = state.orchestrator.execute(config.clone(), cancel_rx).await?;
    let run_id = handle.id.clone();

    state.register_run(&run_id, &config, cancel_tx).await;

    let state_clone = state.clone();
    let id = run_id.clone();
    let task = handle.task;
    tokio::spawn(async move {
        if let Err(e) = task.await {
            tracing::error!("Run {} driver task failed: {}", id, e);
        }
        state_clone.finish_run(&id).await;
    });

    let stream = ReceiverStream::new(handle.output).map(Ok::<_, Infallible>);

    Response::builder()
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(RUN_ID_HEADER, run_id)
        .body(Body::from_stream(stream))
        .map_err(|e| PanelError::Other(format!("failed to build response: {}", e)))
}
