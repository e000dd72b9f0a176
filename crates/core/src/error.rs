//! Unified error type for sourcemill operations
//!
//! Failures fall into a few families: storage faults (I/O level, always
//! abort the current operation), safety violations (a path tried to leave
//! its area root), workspace refusals (locked/released/missing), and
//! internal invariant breaks. Check-level findings are not errors; those
//! are recorded as [`crate::Diagnostic`]s and never propagate.

use std::io;
use thiserror::Error;

/// Result type alias for sourcemill operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for workspace, storage, and packaging operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Low-level storage fault. The current operation is aborted; callers
    /// must not swallow this.
    #[error("storage error: {message}")]
    Storage {
        /// What failed
        message: String,
        /// Underlying cause, when there is one
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A path escaped its area root, or would have.
    #[error("unsafe path refused: {path}")]
    UnsafePath {
        /// The offending workspace-relative path
        path: String,
    },

    /// The workspace refuses mutations in its current state.
    #[error("workspace is not writable ({state})")]
    NotWritable {
        /// Status or lock state that caused the refusal
        state: String,
    },

    /// No workspace exists for the requested upload id.
    #[error("workspace not found: {upload_id}")]
    WorkspaceNotFound {
        /// The requested upload id
        upload_id: u64,
    },

    /// A file lookup against the index failed.
    #[error("no such file: {path}")]
    FileNotFound {
        /// The requested workspace-relative path
        path: String,
    },

    /// The source area holds nothing to pack.
    #[error("no content to pack")]
    NoContentToPack,

    /// The check pipeline failed to reach a fixed point.
    #[error("checks did not converge after {passes} passes")]
    ChecksNotConverging {
        /// Number of whole passes that ran
        passes: usize,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {message}")]
    Serialization {
        /// What went wrong
        message: String,
    },

    /// Unexpected internal state. Indicates a bug.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the broken invariant
        message: String,
    },
}

impl Error {
    /// Create a Storage error without an underlying cause.
    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Create a Storage error wrapping an underlying cause.
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an UnsafePath error.
    pub fn unsafe_path(path: impl Into<String>) -> Self {
        Error::UnsafePath { path: path.into() }
    }

    /// Create a NotWritable error from the state that caused the refusal.
    pub fn not_writable(state: impl Into<String>) -> Self {
        Error::NotWritable {
            state: state.into(),
        }
    }

    /// Create a FileNotFound error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Error::FileNotFound { path: path.into() }
    }

    /// Create an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Create a Serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Error::Serialization {
            message: message.into(),
        }
    }

    /// Stable code for programmatic handling upstream.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Storage { .. } | Error::UnsafePath { .. } => "storage_failed",
            Error::NotWritable { .. } => "workspace_not_writable",
            Error::WorkspaceNotFound { .. } => "workspace_not_found",
            Error::FileNotFound { .. } => "file_not_found",
            Error::NoContentToPack => "no_content_to_pack",
            Error::ChecksNotConverging { .. } => "checks_not_converging",
            Error::Serialization { .. } => "serialization_failed",
            Error::Internal { .. } => "internal_error",
        }
    }

    /// Check if this is a storage-level fault (I/O or safety).
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage { .. } | Error::UnsafePath { .. })
    }

    /// Check if this is a workspace-state refusal rather than a fault.
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            Error::NotWritable { .. } | Error::WorkspaceNotFound { .. }
        )
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Storage {
            message: format!("I/O error: {}", e),
            source: Some(Box::new(e)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization {
            message: format!("JSON error: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_display() {
        let err = Error::storage("write failed");
        assert!(err.to_string().contains("storage error"));
        assert!(err.to_string().contains("write failed"));
        assert!(err.is_storage_error());
        assert_eq!(err.code(), "storage_failed");
    }

    #[test]
    fn test_storage_with_source() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = Error::storage_with_source("open failed", io_err);
        match err {
            Error::Storage { source, .. } => assert!(source.is_some()),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_unsafe_path_is_storage_level() {
        let err = Error::unsafe_path("../../etc/passwd");
        assert!(err.is_storage_error());
        assert_eq!(err.code(), "storage_failed");
        assert!(err.to_string().contains("../../etc/passwd"));
    }

    #[test]
    fn test_not_writable() {
        let err = Error::not_writable("locked");
        assert!(err.is_refusal());
        assert!(!err.is_storage_error());
        assert_eq!(err.code(), "workspace_not_writable");
        assert!(err.to_string().contains("locked"));
    }

    #[test]
    fn test_workspace_not_found() {
        let err = Error::WorkspaceNotFound { upload_id: 42 };
        assert!(err.is_refusal());
        assert_eq!(err.code(), "workspace_not_found");
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_no_content_to_pack() {
        assert_eq!(Error::NoContentToPack.code(), "no_content_to_pack");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(err.is_storage_error());
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_file_not_found() {
        let err = Error::file_not_found("main.tex");
        assert_eq!(err.code(), "file_not_found");
        assert!(err.to_string().contains("main.tex"));
    }

    #[test]
    fn test_result_alias() {
        fn ok() -> Result<u32> {
            Ok(7)
        }
        fn fail() -> Result<u32> {
            Err(Error::internal("boom"))
        }
        assert_eq!(ok().unwrap(), 7);
        assert!(fail().is_err());
    }
}
