//! Error types for the directory store.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur reading or writing the directory.
///
/// Store failures are fatal to a reconciliation run: if the directory
/// cannot be read or written, the run aborts without applying its local
/// plan. Remote pushes already issued stand; they are idempotent.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error on the backing file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The persisted directory could not be decoded.
    #[error("directory corrupt: {message}")]
    Corrupt {
        /// Description of the decode failure.
        message: String,
    },

    /// Another process holds the store lock.
    #[error("store locked: another process has exclusive access")]
    Locked,
}

impl StoreError {
    /// Creates a corruption error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoreError::corrupt("unexpected end of file");
        assert_eq!(err.to_string(), "directory corrupt: unexpected end of file");

        assert!(StoreError::Locked.to_string().contains("exclusive"));
    }
}
