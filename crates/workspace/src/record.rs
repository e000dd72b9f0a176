//! Plain value snapshots of a workspace
//!
//! The persistence and HTTP layers live outside this repository; they
//! store and serve these records. Nothing here references storage or the
//! checker machinery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sourcemill_core::{FileType, LockState, Readiness, SourceType, Status};

use crate::file::UserFile;

/// Snapshot of one file for external listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Workspace-relative path.
    pub path: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Detected file type.
    pub file_type: FileType,
    /// Whether the entry is a directory.
    pub is_directory: bool,
    /// Whether the file is ancillary.
    pub is_ancillary: bool,
    /// Last-modified time, when known.
    pub last_modified: Option<DateTime<Utc>>,
}

impl From<&UserFile> for FileRecord {
    fn from(f: &UserFile) -> Self {
        FileRecord {
            path: f.path.clone(),
            size_bytes: f.size_bytes,
            file_type: f.file_type,
            is_directory: f.is_directory,
            is_ancillary: f.is_ancillary,
            last_modified: f.last_modified,
        }
    }
}

/// Snapshot of a workspace's scalar state plus its diagnostics and file
/// listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceRecord {
    /// Immutable workspace id.
    pub upload_id: u64,
    /// Owner identifier.
    pub owner_user_id: String,
    /// External submission id, when associated.
    pub submission_id: Option<String>,
    /// Creation time (UTC).
    pub created_datetime: DateTime<Utc>,
    /// Last index mutation time (UTC).
    pub modified_datetime: DateTime<Utc>,
    /// When the last upload began.
    pub lastupload_start_datetime: Option<DateTime<Utc>>,
    /// When the last upload finished.
    pub lastupload_completion_datetime: Option<DateTime<Utc>>,
    /// Activity status.
    pub status: Status,
    /// Lock state.
    pub lock_state: LockState,
    /// Aggregate source classification.
    pub source_type: SourceType,
    /// Derived gate status.
    pub readiness: Readiness,
    /// Total bytes across live files.
    pub total_size_bytes: u64,
    /// `(severity, path, message)` triples in insertion order.
    pub diagnostics: Vec<(String, String, String)>,
    /// Client-visible files.
    pub files: Vec<FileRecord>,
}
