//! ccloud-metrics error types

use std::time::Duration;

/// ccloud-metrics error types
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    // Transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The query was rejected locally before any request was sent.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid granularity '{0}'")]
    InvalidGranularity(String),

    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("operation not implemented: {0}")]
    NotImplemented(&'static str),
}

impl MetricsError {
    /// HTTP status code for errors that came back from the API.
    pub fn status(&self) -> Option<u16> {
        match self {
            MetricsError::Api { status, .. } => Some(*status),
            MetricsError::RateLimited { .. } => Some(429),
            MetricsError::AuthenticationFailed => Some(401),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for MetricsError {
    fn from(err: reqwest::Error) -> Self {
        MetricsError::Http(err.to_string())
    }
}

/// Result type alias for ccloud-metrics operations
pub type Result<T> = std::result::Result<T, MetricsError>;
