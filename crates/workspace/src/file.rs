//! A single file known to a workspace

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sourcemill_core::{path as relpath, FileType};
use sourcemill_storage::PathContext;

/// One file (or directory) in a workspace's index.
///
/// The `path` is workspace-source-relative, POSIX style, with no leading
/// slash; ancillary files carry the `anc/` prefix. A removed file is no
/// longer present under the source tree; its entry is retained with
/// `is_removed` set and the reason recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFile {
    /// Workspace-relative path (`anc/...` for ancillary files).
    pub path: String,
    /// Size in bytes at the time of the last index refresh.
    pub size_bytes: u64,
    /// Detected semantic type; `Unknown` until inference runs.
    pub file_type: FileType,
    /// Whether this entry is a directory.
    pub is_directory: bool,
    /// Whether the file lives under the ancillary subtree.
    pub is_ancillary: bool,
    /// Whether the file was moved aside to the removed area.
    pub is_removed: bool,
    /// Whether this is an internal workspace artifact, hidden from all
    /// external views.
    pub is_system: bool,
    /// Whether the current check pass has visited this file.
    pub is_checked: bool,
    /// Whether the file has been promoted out of quarantine.
    pub is_persisted: bool,
    /// Last-modified time, when known.
    pub last_modified: Option<DateTime<Utc>>,
    /// Why the file was removed, when it was.
    pub reason_for_removal: Option<String>,
}

impl UserFile {
    /// Create an entry for a regular live source file.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let is_ancillary = path.starts_with("anc/");
        UserFile {
            path,
            size_bytes: 0,
            file_type: FileType::Unknown,
            is_directory: false,
            is_ancillary,
            is_removed: false,
            is_system: false,
            is_checked: false,
            is_persisted: false,
            last_modified: None,
            reason_for_removal: None,
        }
    }

    /// Create a directory entry.
    pub fn directory(path: impl Into<String>) -> Self {
        let mut f = UserFile::new(path);
        f.is_directory = true;
        f.file_type = FileType::Directory;
        f
    }

    /// Create a system-file entry (never shown externally).
    pub fn system(path: impl Into<String>) -> Self {
        let mut f = UserFile::new(path);
        f.is_system = true;
        f.is_ancillary = false;
        f
    }

    /// File name without directory.
    pub fn name(&self) -> &str {
        relpath::basename(&self.path)
    }

    /// Containing directory, empty for top-level entries.
    pub fn dir(&self) -> &str {
        relpath::parent(&self.path)
    }

    /// Extension without the dot, empty when absent.
    pub fn ext(&self) -> &str {
        relpath::extension(&self.path)
    }

    /// Whether the file has zero length.
    pub fn is_empty(&self) -> bool {
        self.size_bytes == 0
    }

    /// Whether the detected type is in the TeX family.
    pub fn is_tex_type(&self) -> bool {
        self.file_type.is_tex()
    }

    /// Whether inference has not yet assigned a type.
    pub fn is_type_unknown(&self) -> bool {
        self.file_type == FileType::Unknown
    }

    /// Storage resolution context for this file.
    pub fn path_context(&self) -> PathContext {
        PathContext {
            is_ancillary: self.is_ancillary,
            is_removed: self.is_removed,
            is_system: self.is_system,
            is_persisted: self.is_persisted,
        }
    }
}

/// Options for registering a new file in a workspace.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Force the ancillary flag; `None` lets the workspace infer it from
    /// the path prefix.
    pub is_ancillary: Option<bool>,
    /// Register a directory rather than a file.
    pub is_directory: bool,
    /// Register a system file.
    pub is_system: bool,
    /// Create an empty file on disk. When false the file must already
    /// exist (e.g. it was just extracted from an archive).
    pub touch: bool,
    /// Initial file type; defaults to `Unknown` (or `Directory`).
    pub file_type: Option<FileType>,
}

impl CreateOptions {
    /// Defaults for a fresh upload payload: touch on, everything inferred.
    pub fn touch() -> Self {
        CreateOptions {
            touch: true,
            ..Default::default()
        }
    }

    /// Defaults for a file already materialized on disk.
    pub fn existing() -> Self {
        CreateOptions::default()
    }
}
