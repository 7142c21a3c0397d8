//! Error types for the snapshot library
//!
//! This module defines all error types that can occur during snapshot
//! operations. Every fallible operation in the crate returns
//! [`Result<T>`], carrying both a structured error kind and a display
//! string suitable for rendering to a user.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the snapshot library
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Main error type for all snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A relative path failed validation (absolute, escaping, or empty)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Project root, snapshot, or metadata document is missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Metadata document exists but cannot be decoded
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Metadata document was written by an unsupported codec version
    #[error("Unsupported metadata version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version tag found in the document
        found: u32,
        /// Version this codec supports
        supported: u32,
    },

    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error with the offending relative path attached
    #[error("IO error at {path:?}: {source}")]
    IoAt {
        /// Path being read or written when the error occurred
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Stored bytes no longer match their recorded content hash
    #[error("Integrity mismatch for {path:?} - expected: {expected}, actual: {actual}")]
    IntegrityMismatch {
        /// File whose stored bytes are corrupt
        path: PathBuf,
        /// Hash recorded at snapshot time
        expected: String,
        /// Hash computed from the bytes on disk
        actual: String,
    },

    /// Progress callback returned false
    #[error("Operation cancelled")]
    Cancelled,
}

impl SnapshotError {
    /// Create an `InvalidPath` error with a custom message
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        SnapshotError::InvalidPath(msg.into())
    }

    /// Create a `NotFound` error with a custom message
    pub fn not_found(msg: impl Into<String>) -> Self {
        SnapshotError::NotFound(msg.into())
    }

    /// Create an `InvalidMetadata` error with a custom message
    pub fn metadata(msg: impl Into<String>) -> Self {
        SnapshotError::InvalidMetadata(msg.into())
    }

    /// Attach a path to an I/O error
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SnapshotError::IoAt {
            path: path.into(),
            source,
        }
    }

    /// Check if this error was a cooperative cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SnapshotError::Cancelled)
    }

    /// Check if this error indicates archive corruption
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            SnapshotError::IntegrityMismatch { .. }
                | SnapshotError::InvalidMetadata(_)
                | SnapshotError::UnsupportedVersion { .. }
        )
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            SnapshotError::NotFound(what) => {
                format!("{} was not found. It may have been deleted outside the application.", what)
            }
            SnapshotError::UnsupportedVersion { found, supported } => {
                format!(
                    "This snapshot was written by a different version of the application \
                     (format {} vs {}). Upgrade to read it.",
                    found, supported
                )
            }
            SnapshotError::IntegrityMismatch { path, .. } => {
                format!(
                    "The archived copy of {:?} is corrupt and was not restored. \
                     The snapshot archive may have been modified on disk.",
                    path
                )
            }
            SnapshotError::Cancelled => "The operation was cancelled.".to_string(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SnapshotError::not_found("Snapshot 20240101-120000-000_abcd1234");
        assert_eq!(
            err.to_string(),
            "Not found: Snapshot 20240101-120000-000_abcd1234"
        );
    }

    #[test]
    fn test_error_corruption() {
        assert!(SnapshotError::IntegrityMismatch {
            path: PathBuf::from("src/main.ino"),
            expected: "abc".to_string(),
            actual: "def".to_string(),
        }
        .is_corruption());
        assert!(!SnapshotError::Cancelled.is_corruption());
        assert!(SnapshotError::Cancelled.is_cancelled());
    }

    #[test]
    fn test_user_message_version() {
        let err = SnapshotError::UnsupportedVersion {
            found: 7,
            supported: 1,
        };
        assert!(err.user_message().contains("format 7 vs 1"));
    }
}
