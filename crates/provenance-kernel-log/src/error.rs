//! Error types for log clients.

use std::time::Duration;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur during log operations.
#[derive(Debug, Error)]
pub enum LogError {
    /// The log could not be reached.
    #[error("log unavailable: {0}")]
    Unavailable(String),

    /// A single call did not complete in time.
    #[error("log call timed out after {0:?}")]
    Timeout(Duration),

    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("migration error: {0}")]
    Migration(String),

    /// A thread panicked while holding the connection.
    #[error("connection poisoned: {0}")]
    Poisoned(String),
}

impl LogError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            LogError::Unavailable(_) | LogError::Timeout(_) => true,
            LogError::Database(rusqlite::Error::SqliteFailure(e, _)) => {
                matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
            }
            _ => false,
        }
    }
}

/// Result type for log operations.
pub type Result<T> = std::result::Result<T, LogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LogError::Unavailable("mirror down".into()).is_transient());
        assert!(LogError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!LogError::ChannelNotFound("0.0.1".into()).is_transient());
        assert!(!LogError::Poisoned("panic".into()).is_transient());

        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(LogError::Database(busy).is_transient());
    }
}
