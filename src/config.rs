use clap::Parser;
use std::path::PathBuf;

/// k6 Panel — browser control panel that drives the k6 load-testing binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "k6-panel")]
pub struct CliArgs {
    /// HTTP port for the panel API
    #[arg(long = "port", default_value_t = DEFAULT_PANEL_PORT)]
    pub port: u16,

    /// Address to bind the HTTP listener on
    #[arg(long = "bind", default_value = "0.0.0.0")]
    pub bind: String,

    /// Storage root for reports and temporary run files
    #[arg(short = 'D', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// k6 executable (looked up on PATH unless absolute)
    #[arg(long = "k6-bin", default_value = "k6")]
    pub k6_bin: PathBuf,

    /// Seconds added to the test duration before a run is killed
    #[arg(long = "timeout-grace-secs", default_value_t = DEFAULT_TIMEOUT_GRACE_SECS)]
    pub timeout_grace_secs: u64,

    /// Also write tracing output to this file
    #[arg(short = 'l', long = "log-file")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub port: u16,
    pub bind: String,
    pub data_dir: PathBuf,
    pub k6_bin: PathBuf,
    pub timeout_grace_secs: u64,
    pub log_file: Option<PathBuf>,
}

// Server constants
pub const DEFAULT_PANEL_PORT: u16 = 9880;
pub const DATA_DIR_NAME: &str = "k6-panel";
pub const FALLBACK_DATA_DIR: &str = "k6-panel-data";

// Run constants
pub const MAX_VIRTUAL_USERS: u32 = 100;
pub const MAX_TEST_DURATION_SECS: u64 = 7 * 24 * 3600;
pub const DEFAULT_TIMEOUT_GRACE_SECS: u64 = 60;
pub const GRACEFUL_KILL_TIMEOUT_SECS: u64 = 5;
pub const OUTPUT_CHANNEL_CAPACITY: usize = 64;
pub const READ_CHUNK_SIZE: usize = 8192;

// Activity log constants
pub const ACTIVITY_BUFFER_SIZE: usize = 500;

impl PanelConfig {
    pub fn from_args(args: CliArgs) -> Self {
        let data_dir = args.data_dir.unwrap_or_else(default_data_dir);

        PanelConfig {
            port: args.port,
            bind: args.bind,
            data_dir,
            k6_bin: args.k6_bin,
            timeout_grace_secs: args.timeout_grace_secs,
            log_file: args.log_file,
        }
    }

    /// Directory holding one `<id>.json` file per completed run.
    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }

    /// Directory for per-run script and summary files.
    pub fn scratch_dir(&self) -> PathBuf {
        self.data_dir.join("tmp")
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR))
}
