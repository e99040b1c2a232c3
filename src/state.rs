use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, RwLock};
use tracing::info;

use crate::activity::ActivityLog;
use crate::config::PanelConfig;
use crate::error::PanelError;
use crate::process::engine::EngineCommand;
use crate::process::orchestrator::Orchestrator;
use crate::report::ReportStore;
use crate::run_config::{HttpMethod, RunConfig};

pub type SharedState = Arc<PanelState>;

pub struct PanelState {
    pub config: PanelConfig,
    pub store: ReportStore,
    pub orchestrator: Orchestrator,
    pub activity: Arc<ActivityLog>,
    pub runs: RwLock<HashMap<String, ActiveRun>>,
}

/// Registry entry for a run whose engine is still going.
pub struct ActiveRun {
    pub info: ActiveRunInfo,
    pub cancel: Option<oneshot::Sender<()>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveRunInfo {
    pub id: String,
    pub url: String,
    pub method: HttpMethod,
    pub vus: u32,
    pub duration: String,
    pub started_at: DateTime<Utc>,
    pub cancel_requested: bool,
}

impl PanelState {
    pub fn new(config: PanelConfig) -> Self {
        let engine = EngineCommand::new(&config.k6_bin);
        Self::with_engine(config, engine)
    }

    pub fn with_engine(config: PanelConfig, engine: EngineCommand) -> Self {
        let activity = Arc::new(ActivityLog::new());
        let store = ReportStore::new(config.reports_dir());
        let orchestrator =
            Orchestrator::from_config(&config, engine, store.clone(), activity.clone());
        Self {
            config,
            store,
            orchestrator,
            activity,
            runs: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register_run(&self, id: &str, config: &RunConfig, cancel: oneshot::Sender<()>) {
        let info = ActiveRunInfo {
            id: id.to_string(),
            url: config.target_url.clone(),
            method: config.method,
            vus: config.virtual_users,
            duration: config.duration.clone(),
            started_at: Utc::now(),
            cancel_requested: false,
        };
        self.runs.write().await.insert(
            id.to_string(),
            ActiveRun {
                info,
                cancel: Some(cancel),
            },
        );
    }

    pub async fn finish_run(&self, id: &str) {
        self.runs.write().await.remove(id);
    }

    /// In-flight runs, oldest first.
    pub async fn active_runs(&self) -> Vec<ActiveRunInfo> {
        let mut runs: Vec<_> = self.runs.read().await.values().map(|r| r.info.clone()).collect();
        runs.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        runs
    }

    pub async fn cancel_run(&self, id: &str) -> Result<(), PanelError> {
        let mut runs = self.runs.write().await;
        let run = runs
            .get_mut(id)
            .ok_or_else(|| PanelError::RunNotActive(id.to_string()))?;

        if let Some(cancel) = run.cancel.take() {
            let _ = cancel.send(());
            run.info.cancel_requested = true;
            info!("Cancellation requested for run {}", id);
        }
        Ok(())
    }

    pub async fn cancel_all(&self) -> usize {
        let mut runs = self.runs.write().await;
        let mut cancelled = 0;
        for run in runs.values_mut() {
            if let Some(cancel) = run.cancel.take() {
                let _ = cancel.send(());
                run.info.cancel_requested = true;
                cancelled += 1;
            }
        }
        cancelled
    }
}
