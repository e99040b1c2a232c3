use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("Invalid run configuration: {0}")]
    InvalidConfig(String),

    #[error("Report not found: {0}")]
    NotFound(String),

    #[error("Report {id} is corrupt: {source}")]
    ReportParse {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Run is not active: {0}")]
    RunNotActive(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl PanelError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PanelError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            PanelError::NotFound(_) => StatusCode::NOT_FOUND,
            PanelError::RunNotActive(_) => StatusCode::NOT_FOUND,
            PanelError::ReportParse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            PanelError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PanelError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn summary(&self) -> String {
        match self {
            PanelError::InvalidConfig(_) => "Invalid test configuration".to_string(),
            PanelError::NotFound(_) => "Report not found".to_string(),
            PanelError::RunNotActive(_) => "Run not found".to_string(),
            PanelError::Other(msg) => msg.clone(),
            PanelError::ReportParse { .. } | PanelError::Storage(_) => {
                "Failed to execute request".to_string()
            }
        }
    }
}

impl IntoResponse for PanelError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = serde_json::json!({
            "error": self.summary(),
            "details": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}
