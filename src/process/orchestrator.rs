//! End-to-end execution of one k6 run.
//!
//! `execute` validates the config, writes the generated script and hands back
//! a [`RunHandle`] whose `output` channel carries raw engine output as it is
//! produced. A background task drives the run through spawn, relay, exit
//! handling and report persistence, appends exactly one `[k6-panel]` marker
//! line, removes the run's temporary files and then closes the channel.

use bytes::Bytes;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::activity::{ActivityLevel, ActivityLog};
use crate::config::{
    PanelConfig, GRACEFUL_KILL_TIMEOUT_SECS, OUTPUT_CHANNEL_CAPACITY, READ_CHUNK_SIZE,
};
use crate::error::PanelError;
use crate::process::engine::EngineCommand;
use crate::report::{Report, ReportConfig, ReportStore};
use crate::run_config::RunConfig;
use crate::script;

pub const MARKER_PREFIX: &str = "[k6-panel]";

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Engine exited cleanly and the report was persisted.
    Recorded { report_id: String },
    /// Engine exited cleanly but wrote no summary file.
    SummaryMissing,
    /// Summary file could not be read or parsed.
    SummaryInvalid(String),
    /// Summary was fine but the report could not be written.
    StorageFailed(String),
    /// Engine exited non-zero; `None` when killed by a signal.
    EngineFailed { code: Option<i32> },
    /// Waiting on the engine process itself failed.
    WaitFailed(String),
    SpawnFailed(String),
    Cancelled,
    TimedOut(Duration),
}

impl RunOutcome {
    pub fn report_id(&self) -> Option<&str> {
        match self {
            RunOutcome::Recorded { report_id } => Some(report_id),
            _ => None,
        }
    }

    fn message(&self) -> String {
        match self {
            RunOutcome::Recorded { report_id } => {
                format!("Test completed. Report saved: {}", report_id)
            }
            RunOutcome::SummaryMissing => {
                "Warning: k6 exited successfully but no summary was produced".to_string()
            }
            RunOutcome::SummaryInvalid(msg) => format!("Error: failed to parse k6 summary: {}", msg),
            RunOutcome::StorageFailed(msg) => format!("Error: failed to save report: {}", msg),
            RunOutcome::EngineFailed { code: Some(code) } => format!("k6 exited with code {}", code),
            RunOutcome::EngineFailed { code: None } => "k6 terminated by signal".to_string(),
            RunOutcome::SpawnFailed(msg) => format!("Error: failed to start k6: {}", msg),
            RunOutcome::WaitFailed(msg) => format!("Error: failed waiting for k6: {}", msg),
            RunOutcome::Cancelled => "Run cancelled".to_string(),
            RunOutcome::TimedOut(limit) => format!("Run timed out after {}s", limit.as_secs()),
        }
    }

    /// Marker line appended to the output stream.
    pub fn marker(&self) -> String {
        format!("\n{} {}\n", MARKER_PREFIX, self.message())
    }

    fn level(&self) -> ActivityLevel {
        match self {
            RunOutcome::Recorded { .. } => ActivityLevel::Info,
            RunOutcome::SummaryMissing | RunOutcome::Cancelled => ActivityLevel::Warn,
            _ => ActivityLevel::Error,
        }
    }
}

/// A run in flight: its id, the live output channel, and the driver task.
pub struct RunHandle {
    pub id: String,
    pub output: mpsc::Receiver<Bytes>,
    pub task: JoinHandle<RunOutcome>,
}

/// Per-run temporary files, named after the run id.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub script: PathBuf,
    pub summary: PathBuf,
}

impl RunPaths {
    pub fn new(scratch_dir: &Path, run_id: &str) -> Self {
        Self {
            script: scratch_dir.join(format!("k6-script-{}.js", run_id)),
            summary: scratch_dir.join(format!("k6-summary-{}.json", run_id)),
        }
    }
}

struct RunContext {
    run_id: String,
    report_config: ReportConfig,
    paths: RunPaths,
    limit: Duration,
}

enum Stop {
    Exited(std::io::Result<ExitStatus>),
    Cancelled,
    TimedOut,
}

#[derive(Clone)]
pub struct Orchestrator {
    engine: EngineCommand,
    scratch_dir: PathBuf,
    store: ReportStore,
    activity: Arc<ActivityLog>,
    timeout_grace: Duration,
}

impl Orchestrator {
    pub fn new(
        engine: EngineCommand,
        scratch_dir: impl Into<PathBuf>,
        store: ReportStore,
        activity: Arc<ActivityLog>,
        timeout_grace: Duration,
    ) -> Self {
        Self {
            engine,
            scratch_dir: scratch_dir.into(),
            store,
            activity,
            timeout_grace,
        }
    }

    pub fn from_config(
        config: &PanelConfig,
        engine: EngineCommand,
        store: ReportStore,
        activity: Arc<ActivityLog>,
    ) -> Self {
        Self::new(
            engine,
            config.scratch_dir(),
            store,
            activity,
            Duration::from_secs(config.timeout_grace_secs),
        )
    }

    /// Start a run. Invalid configs and script write failures are returned
    /// here, before anything is spawned; everything later is reported on the
    /// output stream. Dropping `cancel`'s sender does not cancel the run.
    pub async fn execute(
        &self,
        config: RunConfig,
        cancel: oneshot::Receiver<()>,
    ) -> Result<RunHandle, PanelError> {
        let script = script::generate(&config)?;
        let limit = config
            .test_duration()?
            .checked_add(self.timeout_grace)
            .ok_or_else(|| {
                PanelError::InvalidConfig(format!("duration {:?} is too long", config.duration))
            })?;

        let run_id = new_run_id();
        let paths = RunPaths::new(&self.scratch_dir, &run_id);

        tokio::fs::create_dir_all(&self.scratch_dir).await?;
        if let Err(e) = tokio::fs::write(&paths.script, script).await {
            remove_temp_files(&paths).await;
            return Err(e.into());
        }

        info!(
            "Run {} starting: {} {} ({} VUs, {})",
            run_id, config.method, config.target_url, config.virtual_users, config.duration
        );
        self.activity
            .emit(
                Some(&run_id),
                ActivityLevel::Info,
                format!(
                    "Run started: {} {} ({} VUs, {})",
                    config.method, config.target_url, config.virtual_users, config.duration
                ),
            )
            .await;

        let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let ctx = RunContext {
            run_id: run_id.clone(),
            report_config: ReportConfig::from(&config),
            paths,
            limit,
        };

        let this = self.clone();
        let task = tokio::spawn(async move { this.drive(ctx, tx, cancel).await });

        Ok(RunHandle {
            id: run_id,
            output: rx,
            task,
        })
    }

    async fn drive(
        &self,
        ctx: RunContext,
        tx: mpsc::Sender<Bytes>,
        cancel: oneshot::Receiver<()>,
    ) -> RunOutcome {
        let outcome = self.run_engine(&ctx, &tx, cancel).await;

        if tx.send(Bytes::from(outcome.marker())).await.is_err() {
            debug!("Run {} output consumer went away before the final marker", ctx.run_id);
        }

        remove_temp_files(&ctx.paths).await;

        match outcome.level() {
            ActivityLevel::Info => info!("Run {} finished: {}", ctx.run_id, outcome.message()),
            ActivityLevel::Warn => warn!("Run {} finished: {}", ctx.run_id, outcome.message()),
            ActivityLevel::Error => error!("Run {} finished: {}", ctx.run_id, outcome.message()),
        }
        self.activity
            .emit(Some(&ctx.run_id), outcome.level(), outcome.message())
            .await;

        outcome
    }

    async fn run_engine(
        &self,
        ctx: &RunContext,
        tx: &mpsc::Sender<Bytes>,
        cancel: oneshot::Receiver<()>,
    ) -> RunOutcome {
        let mut child = match self.engine.spawn(&ctx.paths.script, &ctx.paths.summary) {
            Ok(child) => child,
            Err(e) => return RunOutcome::SpawnFailed(e.to_string()),
        };
        debug!("Run {} spawned k6 with PID {:?}", ctx.run_id, child.id());

        let relays: Vec<JoinHandle<()>> = [
            child.stdout.take().map(|out| spawn_relay(out, tx.clone())),
            child.stderr.take().map(|err| spawn_relay(err, tx.clone())),
        ]
        .into_iter()
        .flatten()
        .collect();

        let stop = tokio::select! {
            res = child.wait() => Stop::Exited(res),
            _ = cancelled(cancel) => Stop::Cancelled,
            _ = tokio::time::sleep(ctx.limit) => Stop::TimedOut,
        };

        if !matches!(stop, Stop::Exited(_)) {
            terminate(&mut child, &ctx.run_id).await;
        }
        drain_relays(relays, &ctx.run_id).await;

        match stop {
            Stop::Cancelled => RunOutcome::Cancelled,
            Stop::TimedOut => RunOutcome::TimedOut(ctx.limit),
            Stop::Exited(Err(e)) => RunOutcome::WaitFailed(e.to_string()),
            Stop::Exited(Ok(status)) => match status.code() {
                Some(0) => self.record(ctx).await,
                code => RunOutcome::EngineFailed { code },
            },
        }
    }

    async fn record(&self, ctx: &RunContext) -> RunOutcome {
        let raw = match tokio::fs::read(&ctx.paths.summary).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return RunOutcome::SummaryMissing,
            Err(e) => return RunOutcome::SummaryInvalid(e.to_string()),
        };

        let summary: serde_json::Value = match serde_json::from_slice(&raw) {
            Ok(summary) => summary,
            Err(e) => return RunOutcome::SummaryInvalid(e.to_string()),
        };

        let report = Report {
            id: ctx.run_id.clone(),
            timestamp: Utc::now(),
            config: ctx.report_config.clone(),
            summary,
        };

        match self.store.save(&report).await {
            Ok(_) => RunOutcome::Recorded {
                report_id: report.id,
            },
            Err(e) => RunOutcome::StorageFailed(e.to_string()),
        }
    }
}

/// Timestamp-prefixed id with a random suffix so back-to-back submissions
/// within the same millisecond still differ.
pub fn new_run_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().format("%Y%m%dT%H%M%S%3f"), &suffix[..8])
}

/// Resolves only on an explicit cancel; a dropped sender never fires.
async fn cancelled(cancel: oneshot::Receiver<()>) {
    if cancel.await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Forward raw chunks from one child pipe. When the consumer is gone the pipe
/// is still drained so k6 never blocks on a full pipe.
fn spawn_relay<R>(mut reader: R, tx: mpsc::Sender<Bytes>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        let mut consumer_gone = false;

        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    if consumer_gone {
                        continue;
                    }
                    if tx.send(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                        debug!("Output consumer disconnected, discarding remaining output");
                        consumer_gone = true;
                    }
                }
                Err(e) => {
                    warn!("Error reading k6 output: {}", e);
                    break;
                }
            }
        }
    })
}

async fn terminate(child: &mut Child, run_id: &str) {
    if let Err(e) = child.start_kill() {
        warn!("Run {}: failed to kill k6: {}", run_id, e);
    }

    match tokio::time::timeout(Duration::from_secs(GRACEFUL_KILL_TIMEOUT_SECS), child.wait()).await {
        Ok(Ok(status)) => debug!("Run {}: k6 stopped ({})", run_id, status),
        Ok(Err(e)) => warn!("Run {}: error waiting for killed k6: {}", run_id, e),
        Err(_) => warn!("Run {}: k6 did not exit within timeout", run_id),
    }
}

async fn drain_relays(relays: Vec<JoinHandle<()>>, run_id: &str) {
    for mut relay in relays {
        let wait = tokio::time::timeout(Duration::from_secs(GRACEFUL_KILL_TIMEOUT_SECS), &mut relay);
        if wait.await.is_err() {
            warn!("Run {}: output pipe still open after exit, abandoning relay", run_id);
            relay.abort();
        }
    }
}

async fn remove_temp_files(paths: &RunPaths) {
    for path in [&paths.script, &paths.summary] {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("Removed {:?}", path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove temporary file {:?}: {}", path, e),
        }
    }
}
