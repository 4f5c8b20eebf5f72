use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Snapshot provider could not enumerate processes.
    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single terminator call.
///
/// Always absorbed into that record's outcome, never propagated out of a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TerminateError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Other(String),
}
