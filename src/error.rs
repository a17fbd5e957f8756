use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::model::OperationStatus;

/// Structural errors. These abort a run or are returned to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Root path missing or not a directory.
    #[error("invalid path {}: {reason}", path.display())]
    InvalidPath { path: PathBuf, reason: String },

    /// Mode parameters that can never produce a move.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The operation log store could not be read or written.
    #[error("operation log storage failed at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A persisted record exists but cannot be decoded.
    #[error("corrupt operation record {}: {source}", path.display())]
    CorruptRecord {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be serialized for writing.
    #[error("cannot encode operation record {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A run failed midway; whatever it had logged was rolled back.
    #[error("operation {id} aborted: {source}")]
    Aborted {
        id: Uuid,
        #[source]
        source: Box<Error>,
    },

    #[error("operation {0} not found")]
    NotFound(Uuid),

    #[error("operation {id} is {status} and cannot be rolled back")]
    NotRollbackable { id: Uuid, status: OperationStatus },
}

impl Error {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Whether the error happened before any file was touched.
    pub fn is_setup_error(&self) -> bool {
        matches!(self, Self::InvalidPath { .. } | Self::InvalidInput(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Per-file failure. Recorded in the run statistics and skipped, never fatal.
#[derive(Debug, Error)]
pub enum FileMoveError {
    #[error("source vanished before it could be moved: {}", path.display())]
    SourceVanished { path: PathBuf },

    /// The log stores paths as UTF-8, so such a file could never be rolled back.
    #[error("path is not valid UTF-8: {}", path.display())]
    NonUtf8Path { path: PathBuf },

    #[error("no free name found for {}", path.display())]
    ConflictUnresolvable { path: PathBuf },

    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FileMoveError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
