//! The storage adapter contract
//!
//! A [`StorageAdapter`] maps `(upload_id, relative path, context)` onto the
//! filesystem and performs all file I/O for a workspace. The workspace
//! aggregate never touches `std::fs` directly.
//!
//! Path resolution context travels in a [`PathContext`]: whether the file
//! is ancillary (must stay under `src/anc/`), removed (lives in the flat
//! removed area), a system artifact (lives in the workspace directory
//! itself), or persisted (quarantine backend only: already promoted to the
//! permanent root).

use chrono::{DateTime, Utc};
use sourcemill_core::Result;
use std::fs::File;
use std::path::PathBuf;

use crate::paths::{Area, WorkspacePaths};

/// Resolution context for a workspace-relative path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathContext {
    /// File lives under the ancillary subtree (`anc/` prefix required).
    pub is_ancillary: bool,
    /// File has been moved to the removed area.
    pub is_removed: bool,
    /// File is an internal workspace artifact (e.g. the source log).
    pub is_system: bool,
    /// File has been promoted out of quarantine (quarantine backend only).
    pub is_persisted: bool,
}

impl PathContext {
    /// Context for a live source file.
    pub fn source() -> Self {
        PathContext::default()
    }

    /// Context for an ancillary file.
    pub fn ancillary() -> Self {
        PathContext {
            is_ancillary: true,
            ..Default::default()
        }
    }

    /// Context for a system file.
    pub fn system() -> Self {
        PathContext {
            is_system: true,
            ..Default::default()
        }
    }

    /// Context for a removed file.
    pub fn removed() -> Self {
        PathContext {
            is_removed: true,
            ..Default::default()
        }
    }

    /// The logical area this context resolves against.
    pub fn area(&self) -> Area {
        if self.is_removed {
            Area::Removed
        } else if self.is_system {
            Area::System
        } else {
            Area::Source
        }
    }
}

/// File I/O over a workspace directory tree, with the safe-path guarantee.
///
/// Implementations must never create or follow symbolic links, and must
/// refuse any relative path whose normalization escapes its area root.
pub trait StorageAdapter: Send + Sync + std::fmt::Debug {
    /// Directory layout for the given workspace, in the root where new
    /// writes land (the quarantine root for the quarantine backend).
    fn workspace_paths(&self, upload_id: u64) -> WorkspacePaths;

    /// Whether `rel` is safe to use under the given context. A path is safe
    /// iff it resolves to a location under its area root (and under the
    /// ancillary subtree when the context says ancillary).
    fn is_safe(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> bool;

    /// Absolute path for `rel`. Fails with an unsafe-path error when
    /// `is_safe` would return false.
    fn full_path(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<PathBuf>;

    /// Create an empty file at `rel`, creating parent directories as
    /// needed.
    fn create(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<()>;

    /// Create the directory `rel` (and parents).
    fn makedirs(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<()>;

    /// Open for reading. The returned handle releases on drop, on every
    /// exit path.
    fn open_read(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<File>;

    /// Open for writing, truncating; parents are created as needed.
    fn open_write(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<File>;

    /// Open for appending; parents are created as needed.
    fn open_append(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<File>;

    /// Read the whole file into memory.
    fn read_to_vec(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<Vec<u8>> {
        use std::io::Read;
        let mut f = self.open_read(upload_id, rel, ctx)?;
        let mut buf = Vec::new();
        f.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Replace the file's contents with `bytes`.
    fn write_all(&self, upload_id: u64, rel: &str, ctx: &PathContext, bytes: &[u8]) -> Result<()> {
        use std::io::Write;
        let mut f = self.open_write(upload_id, rel, ctx)?;
        f.write_all(bytes)?;
        Ok(())
    }

    /// Whether a file or directory exists at `rel`.
    fn exists(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> bool;

    /// Size of the file in bytes.
    fn size_bytes(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<u64>;

    /// Last modification time, UTC.
    fn last_modified(&self, upload_id: u64, rel: &str, ctx: &PathContext)
        -> Result<DateTime<Utc>>;

    /// Stamp the file or directory's mtime to now.
    fn touch(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<()>;

    /// Copy `from` to `to` within the workspace.
    fn copy(
        &self,
        upload_id: u64,
        from: &str,
        from_ctx: &PathContext,
        to: &str,
        to_ctx: &PathContext,
    ) -> Result<()>;

    /// Rename `from` to `to` within the workspace, replacing `to` if it
    /// exists.
    fn rename(
        &self,
        upload_id: u64,
        from: &str,
        from_ctx: &PathContext,
        to: &str,
        to_ctx: &PathContext,
    ) -> Result<()>;

    /// Move the file to the removed area under a flattened name. Returns
    /// the name used in the removed area.
    fn remove(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<String>;

    /// Permanently delete the file or directory tree at `rel`.
    fn delete(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<()>;

    /// Delete the entire workspace directory tree.
    fn delete_workspace(&self, upload_id: u64) -> Result<()>;

    /// Promote a quarantined file into the permanent root. A no-op for
    /// single-root backends.
    fn persist(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<()>;

    /// Byte-wise comparison of two files.
    fn cmp(
        &self,
        upload_id: u64,
        a: &str,
        a_ctx: &PathContext,
        b: &str,
        b_ctx: &PathContext,
    ) -> Result<bool>;

    /// Whether the file looks like something the tar-family unpacker can
    /// open (plain tar, gzip, or bzip2 magic).
    fn is_tarfile(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> bool;

    /// Apply the standard permission scheme (0o664 files, 0o775
    /// directories) across the workspace tree. No-op on non-unix targets.
    fn set_permissions(&self, upload_id: u64) -> Result<()>;
}
