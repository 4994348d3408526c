//! Session error types.
//!
//! Every variant here ends the session. Recoverable conditions (missing ID
//! list at startup, device not yet attached, a link that reconnects) are
//! handled inside the controller and never surface as errors.

use keybox_hardware::HardwareError;
use keybox_storage::StorageError;
use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Fatal session outcomes.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The control link failed and the single reconnect attempt found nothing.
    #[error("Control link lost: {reason}")]
    LinkLost { reason: String },

    /// The reader stopped delivering events.
    #[error("Reader failure: {source}")]
    Reader {
        #[source]
        source: HardwareError,
    },

    /// Authorization store or access log failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Other device failure outside the link reconnect path.
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// Mode bookkeeping or configuration failure.
    #[error(transparent)]
    Core(#[from] keybox_core::Error),
}

impl SessionError {
    pub fn link_lost(reason: impl Into<String>) -> Self {
        Self::LinkLost {
            reason: reason.into(),
        }
    }

    pub fn reader(source: HardwareError) -> Self {
        Self::Reader { source }
    }

    /// Underlying I/O error kind, when the failure came from the filesystem.
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            Self::Storage(e) => e.io_kind(),
            Self::Hardware(HardwareError::Io(e)) => Some(e.kind()),
            Self::Core(keybox_core::Error::Io(e)) => Some(e.kind()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_link_lost_message() {
        let err = SessionError::link_lost("no device 2341:0043");
        assert_eq!(err.to_string(), "Control link lost: no device 2341:0043");
        assert_eq!(err.io_kind(), None);
    }

    #[test]
    fn test_storage_io_kind() {
        let err = SessionError::from(StorageError::NotFound {
            path: PathBuf::from("idlist.txt"),
        });
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
    }

    #[test]
    fn test_reader_keeps_source() {
        let err = SessionError::reader(HardwareError::disconnected("RFID Reader"));
        assert!(err.to_string().contains("RFID Reader"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
