use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    Router::new()
        // Health
        .route("/health", get(crate::routes::health::health))
        // Runs
        .route("/api/run-test", post(crate::routes::run::run_test))
        .route("/api/runs", get(crate::routes::runs::list_active_runs))
        .route(
            "/api/runs/{id}/cancel",
            post(crate::routes::runs::cancel_run),
        )
        // Reports
        .route("/api/reports", get(crate::routes::reports::list_reports))
        .route("/api/reports/{id}", get(crate::routes::reports::get_report))
        // Activity
        .route(
            "/activity/history",
            get(crate::routes::activity::activity_history),
        )
        .route(
            "/activity/stream",
            get(crate::routes::activity::activity_stream),
        )
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
