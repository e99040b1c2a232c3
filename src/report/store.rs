use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::PanelError;
use crate::report::{Report, ReportListing};

/// Flat-file report storage: one `<id>.json` document per run.
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn report_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Write `report` under its id, creating the directory if needed.
    /// An existing document with the same id is replaced.
    pub async fn save(&self, report: &Report) -> Result<PathBuf, PanelError> {
        if !is_valid_id(&report.id) {
            return Err(PanelError::Other(format!("invalid report id {:?}", report.id)));
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        let json = serde_json::to_string_pretty(report)
            .map_err(|e| PanelError::Other(format!("failed to serialize report: {}", e)))?;

        // Write then rename so listings never observe a half-written document.
        let path = self.report_path(&report.id);
        let partial = self.dir.join(format!("{}.json.partial", report.id));
        let written = match tokio::fs::write(&partial, json).await {
            Ok(()) => tokio::fs::rename(&partial, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }

        debug!("Saved report {} to {:?}", report.id, path);
        Ok(path)
    }

    pub async fn get(&self, id: &str) -> Result<Report, PanelError> {
        if !is_valid_id(id) {
            return Err(PanelError::NotFound(id.to_string()));
        }

        let content = match tokio::fs::read_to_string(self.report_path(id)).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PanelError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content).map_err(|source| PanelError::ReportParse {
            id: id.to_string(),
            source,
        })
    }

    /// All stored reports, newest first. Unreadable or corrupt documents are
    /// skipped with a warning.
    pub async fn list(&self) -> Result<Vec<ReportListing>, PanelError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut listings = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("Skipping unreadable report {:?}: {}", path, e);
                    continue;
                }
            };

            match serde_json::from_str::<Report>(&content) {
                Ok(report) => listings.push(ReportListing::from(report)),
                Err(e) => warn!("Skipping corrupt report {:?}: {}", path, e),
            }
        }

        listings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(listings)
    }
}

/// Report ids double as file names, so only a conservative alphabet is accepted.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
