use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Storage-specific error types for the keybox flat files.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The file does not exist yet. Retryable for the ID list.
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Any other I/O failure (permissions, full disk, failed rename).
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Classify an I/O error raised while touching `path`.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Whether this is the retryable "file missing" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Underlying I/O error kind, if any.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::NotFound { .. } => Some(io::ErrorKind::NotFound),
            Self::Io { source, .. } => Some(source.kind()),
        }
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
