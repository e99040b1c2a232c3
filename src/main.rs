use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use k6_panel::activity::ActivityLevel;
use k6_panel::config::{CliArgs, PanelConfig};
use k6_panel::server;
use k6_panel::state::{PanelState, SharedState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let config = PanelConfig::from_args(args);

    // Keep the guard alive so the file writer flushes on exit.
    let _log_guard = init_tracing(&config)?;

    info!("Starting k6-panel v{}", env!("CARGO_PKG_VERSION"));
    info!("Data dir: {:?}", config.data_dir);
    info!("k6 binary: {:?}", config.k6_bin);

    tokio::fs::create_dir_all(config.reports_dir()).await?;
    tokio::fs::create_dir_all(config.scratch_dir()).await?;

    let addr = config.listen_addr();
    let state: SharedState = Arc::new(PanelState::new(config));

    state
        .activity
        .emit(None, ActivityLevel::Info, format!("Panel starting on {}", addr))
        .await;

    let router = server::build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("k6-panel listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await?;

    info!("k6-panel shutting down");
    Ok(())
}

fn init_tracing(
    config: &PanelConfig,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "k6_panel=info,tower_http=info".into());

    let (file_layer, guard) = match &config.log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("log file path {:?} has no file name", path))?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn shutdown_signal(state: SharedState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }

    info!("Received shutdown signal");
    let cancelled = state.cancel_all().await;
    if cancelled > 0 {
        info!("Cancelled {} in-flight run(s)", cancelled);
    }
    state
        .activity
        .emit(None, ActivityLevel::Info, "Shutdown signal received")
        .await;
}
