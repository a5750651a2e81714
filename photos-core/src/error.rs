use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to the Photos Library API.
#[derive(Debug, Error)]
pub enum PhotosError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected http status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
}

impl PhotosError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PhotosError::Status { status, .. } => Some(*status),
            PhotosError::Transport(e) => e.status(),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token file not found: {0} (complete the OAuth consent flow first)")]
    TokenFileMissing(PathBuf),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed token file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("stored token does not grant scope {0}")]
    MissingScope(String),

    #[error("token expired and cannot be refreshed: {0}")]
    NotRefreshable(&'static str),

    #[error("token refresh failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("token endpoint returned {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

/// Fatal problems detected before any network activity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("browser binary not found: {0}")]
    MissingBrowserBinary(PathBuf),

    #[error("browser profile directory not found: {0}")]
    MissingBrowserProfile(PathBuf),

    #[error("no browser profile directory configured and none could be derived")]
    NoBrowserProfile,

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Why a single album could not be deleted.
#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("removal rejected with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },

    #[error(transparent)]
    Api(PhotosError),

    #[error("browser session failed to start: {0}")]
    Session(String),

    #[error("ui automation failed at {step}: {reason}")]
    Ui { step: &'static str, reason: String },

    #[error("album has no product url")]
    NoProductUrl,

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl From<PhotosError> for DeleteError {
    fn from(e: PhotosError) -> Self {
        match e {
            PhotosError::Status { status, body } => DeleteError::Rejected { status, body },
            other => DeleteError::Api(other),
        }
    }
}

impl DeleteError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            DeleteError::Rejected { status, .. } => Some(*status),
            DeleteError::Api(e) => e.status(),
            _ => None,
        }
    }
}
