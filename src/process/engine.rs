use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};

/// How to invoke the k6 binary for one run.
#[derive(Debug, Clone)]
pub struct EngineCommand {
    pub program: PathBuf,
    /// Arguments placed before `run`, for when k6 is reached through a
    /// wrapper such as an interpreter or launcher script.
    pub prefix_args: Vec<OsString>,
}

impl EngineCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
        }
    }

    pub fn with_prefix_args<I, A>(program: impl Into<PathBuf>, prefix_args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        Self {
            program: program.into(),
            prefix_args: prefix_args.into_iter().map(Into::into).collect(),
        }
    }

    /// `k6 run --summary-export <summary> <script>`
    pub fn args(script: &Path, summary: &Path) -> Vec<OsString> {
        vec![
            "run".into(),
            "--summary-export".into(),
            summary.as_os_str().to_owned(),
            script.as_os_str().to_owned(),
        ]
    }

    /// Spawn k6 with both output pipes captured. The child is killed if its
    /// handle is dropped.
    pub fn spawn(&self, script: &Path, summary: &Path) -> std::io::Result<Child> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.prefix_args)
            .args(Self::args(script, summary))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        cmd.spawn()
    }
}
