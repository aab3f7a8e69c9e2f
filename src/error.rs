use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StandingError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ledger I/O failed for {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not eligible for registration: {0}")]
    NotEligible(String),

    #[error("Student already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StandingError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StandingError::Storage {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StandingError>;
