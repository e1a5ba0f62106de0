//! Error types for every stage of a pass.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to fingerprint a local video file.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// The file is smaller than the two windows the fingerprint reads.
    #[error("file is too small to fingerprint: {size} bytes, need at least {min}")]
    Size { size: u64, min: u64 },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure reported by the remote subtitle service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Worth one more attempt: overload, rate limiting, network trouble.
    #[error("subtitle service unavailable: {0}")]
    Transient(String),

    /// Credentials are wrong or missing. Never retried.
    #[error("subtitle service rejected the credentials: {0}")]
    Auth(String),

    /// The service answered but the request or its response is unusable.
    #[error("subtitle service rejected the request: {0}")]
    Rejected(String),
}

/// Failure while building the candidate set.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Every language group failed, so an empty result means nothing.
    #[error("search failed for all {attempted} language group(s), last error: {last}")]
    AllFailed { attempted: usize, last: ServiceError },
}

/// Failure of an interactive presenter backend.
#[derive(Debug, Error)]
pub enum PresenterError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with status {code:?}")]
    Failed {
        program: &'static str,
        code: Option<i32>,
    },

    #[error("unexpected answer from presenter: {0:?}")]
    InvalidAnswer(String),

    #[error("presenter chose entry {index} but only {len} were offered")]
    OutOfRange { index: usize, len: usize },

    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to fetch or store the chosen subtitle.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download failed: {0}")]
    Service(#[from] ServiceError),

    #[error("download of {file_name} returned no data")]
    Empty { file_name: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything that ends one video's pass with a failure.
#[derive(Debug, Error)]
pub enum PassError {
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("subtitle selection failed: {0}")]
    Presenter(#[from] PresenterError),

    #[error(transparent)]
    Download(#[from] DownloadError),
}

impl PassError {
    /// Whether the failure comes from bad credentials.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::Search(SearchError::Auth(_))
                | Self::Download(DownloadError::Service(ServiceError::Auth(_)))
        )
    }
}
