pub mod store;

pub use store::ReportStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::run_config::{HttpMethod, RunConfig};

/// Persisted record of one successful k6 run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub config: ReportConfig,
    /// k6 `--summary-export` document, stored verbatim.
    pub summary: serde_json::Value,
}

/// The part of a [`RunConfig`] needed to redisplay a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub url: String,
    pub method: HttpMethod,
    pub vus: u32,
    pub duration: String,
}

impl From<&RunConfig> for ReportConfig {
    fn from(config: &RunConfig) -> Self {
        ReportConfig {
            url: config.target_url.clone(),
            method: config.method,
            vus: config.virtual_users,
            duration: config.duration.clone(),
        }
    }
}

/// List-view projection of a [`Report`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportListing {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub config: ReportConfig,
    pub vus: u32,
    pub duration: String,
}

impl From<Report> for ReportListing {
    fn from(report: Report) -> Self {
        ReportListing {
            vus: report.config.vus,
            duration: report.config.duration.clone(),
            id: report.id,
            timestamp: report.timestamp,
            config: report.config,
        }
    }
}
