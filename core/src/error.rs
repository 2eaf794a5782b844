use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{what} not found at {}", path.display())]
    NotFound { what: &'static str, path: PathBuf },

    #[error("index is not fitted or loaded")]
    Unfitted,

    #[error("corrupt {what}: {reason}")]
    Corrupt { what: &'static str, reason: String },

    #[error("query vector has dimension {found}, index expects {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("malformed chunk record at {}:{line}: {source}", path.display())]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("embedding failed: {0}")]
    Embedding(anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] bincode::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn not_found(what: &'static str, path: impl Into<PathBuf>) -> Self {
        Error::NotFound { what, path: path.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
