use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Convenient result alias for the evetour library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised when the remote source answered with a non-success status.
    #[error("fetching {url}: {status}")]
    UpstreamStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Raised when an ingest retry pass completes without making progress.
    #[error("ingest stalled with {pending} entities still failing")]
    IngestStalled { pending: usize },

    /// Raised when a jump log names a system missing from the graph.
    #[error("unknown system name: {name}")]
    UnknownSystem { name: String },

    /// Raised when a tour references a system identifier missing from the graph.
    #[error("unknown system id: {id}")]
    UnknownSystemId { id: u32 },

    /// Raised when a jump log could not be opened or read.
    #[error("reading log {path}")]
    LogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Raised when a solver output file has no `TOUR_SECTION` line.
    #[error("no TOUR_SECTION in {path}")]
    MissingTourSection { path: PathBuf },

    /// Raised when the tour integer sequence could not be interpreted.
    #[error("malformed tour {path}: {detail}")]
    MalformedTour { path: PathBuf, detail: String },

    /// Raised when the external solver exited with a failure status.
    #[error("{binary} failed with {status}:\n{stderr}")]
    SolverFailed {
        binary: String,
        status: ExitStatus,
        stderr: String,
    },

    /// Raised when the login handshake could not complete.
    #[error("login failed: {detail}")]
    AuthFailed { detail: String },

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for HTTP client errors.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Wrapper for JSON (de)serialization errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Wrapper for regex compilation errors.
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Transient errors park the entity in the retry queue instead of
    /// aborting the whole ingest.
    pub(crate) fn is_transient(&self) -> bool {
        matches!(self, Error::Http(_) | Error::UpstreamStatus { .. })
    }
}
