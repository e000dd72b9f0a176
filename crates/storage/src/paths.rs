//! Filesystem layout of a workspace
//!
//! ```text
//! <base>/<upload_id>/src/          live source files
//! <base>/<upload_id>/src/anc/      ancillary files
//! <base>/<upload_id>/removed/      moved-aside files (flat names)
//! <base>/<upload_id>/source.log    append-only event log
//! <base>/<upload_id>/<upload_id>.tar.gz   packed source (derived)
//! <base>/deleted_workspace_logs/   retained logs of destroyed workspaces
//! ```

use sourcemill_core::path as relpath;
use std::path::{Path, PathBuf};

/// Directory holding live source files, under the workspace directory.
pub const SOURCE_PREFIX: &str = "src";
/// Directory holding moved-aside files, under the workspace directory.
pub const REMOVED_PREFIX: &str = "removed";
/// Directory holding ancillary files, under the source directory.
pub const ANCILLARY_PREFIX: &str = "anc";
/// Name of the append-only workspace event log.
pub const SOURCE_LOG_NAME: &str = "source.log";
/// Directory under the base dir where logs of destroyed workspaces are
/// retained.
pub const DELETED_LOGS_DIR: &str = "deleted_workspace_logs";

/// Logical area a relative path resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    /// Live source tree (`src/`, which contains `anc/`).
    Source,
    /// Flat holding area for files moved aside by checkers.
    Removed,
    /// The workspace directory itself; system files such as the source log
    /// live here.
    System,
}

/// Resolved directory layout for one workspace under a base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
    base: PathBuf,
    upload_id: u64,
}

impl WorkspacePaths {
    /// Lay out the workspace for `upload_id` under `base`.
    pub fn new(base: impl Into<PathBuf>, upload_id: u64) -> Self {
        WorkspacePaths {
            base: base.into(),
            upload_id,
        }
    }

    /// The workspace's upload id.
    pub fn upload_id(&self) -> u64 {
        self.upload_id
    }

    /// The base directory holding all workspaces.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// `<base>/<upload_id>`
    pub fn workspace_dir(&self) -> PathBuf {
        self.base.join(self.upload_id.to_string())
    }

    /// `<base>/<upload_id>/src`
    pub fn source_dir(&self) -> PathBuf {
        self.workspace_dir().join(SOURCE_PREFIX)
    }

    /// `<base>/<upload_id>/src/anc`
    pub fn ancillary_dir(&self) -> PathBuf {
        self.source_dir().join(ANCILLARY_PREFIX)
    }

    /// `<base>/<upload_id>/removed`
    pub fn removed_dir(&self) -> PathBuf {
        self.workspace_dir().join(REMOVED_PREFIX)
    }

    /// `<base>/<upload_id>/source.log`
    pub fn source_log(&self) -> PathBuf {
        self.workspace_dir().join(SOURCE_LOG_NAME)
    }

    /// `<base>/<upload_id>/<upload_id>.tar.gz`
    pub fn content_package(&self) -> PathBuf {
        self.workspace_dir()
            .join(format!("{}.tar.gz", self.upload_id))
    }

    /// Root directory for the given logical area.
    pub fn area_root(&self, area: Area) -> PathBuf {
        match area {
            Area::Source => self.source_dir(),
            Area::Removed => self.removed_dir(),
            Area::System => self.workspace_dir(),
        }
    }

    /// Where the source log of a destroyed workspace is retained.
    pub fn deleted_log_path(base: &Path, upload_id: u64) -> PathBuf {
        base.join(DELETED_LOGS_DIR)
            .join(format!("{:09}_source.log", upload_id))
    }
}

/// Resolve `rel` against `root`, refusing anything that would land outside
/// `root`. The check is lexical: `..` climbing past the root, or an
/// absolute path, yields `None`.
pub fn resolve_under(root: &Path, rel: &str) -> Option<PathBuf> {
    let normalized = relpath::normalize(rel)?;
    if normalized.is_empty() {
        return Some(root.to_path_buf());
    }
    Some(root.join(normalized))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let paths = WorkspacePaths::new("/data/uploads", 4007);
        assert_eq!(
            paths.workspace_dir(),
            PathBuf::from("/data/uploads/4007")
        );
        assert_eq!(paths.source_dir(), PathBuf::from("/data/uploads/4007/src"));
        assert_eq!(
            paths.ancillary_dir(),
            PathBuf::from("/data/uploads/4007/src/anc")
        );
        assert_eq!(
            paths.removed_dir(),
            PathBuf::from("/data/uploads/4007/removed")
        );
        assert_eq!(
            paths.source_log(),
            PathBuf::from("/data/uploads/4007/source.log")
        );
        assert_eq!(
            paths.content_package(),
            PathBuf::from("/data/uploads/4007/4007.tar.gz")
        );
    }

    #[test]
    fn test_area_roots() {
        let paths = WorkspacePaths::new("/b", 1);
        assert_eq!(paths.area_root(Area::Source), paths.source_dir());
        assert_eq!(paths.area_root(Area::Removed), paths.removed_dir());
        assert_eq!(paths.area_root(Area::System), paths.workspace_dir());
    }

    #[test]
    fn test_deleted_log_path_is_zero_padded() {
        let p = WorkspacePaths::deleted_log_path(Path::new("/b"), 42);
        assert_eq!(
            p,
            PathBuf::from("/b/deleted_workspace_logs/000000042_source.log")
        );
    }

    #[test]
    fn test_resolve_under_contains() {
        let root = Path::new("/b/1/src");
        assert_eq!(
            resolve_under(root, "a/b.tex").unwrap(),
            PathBuf::from("/b/1/src/a/b.tex")
        );
        assert_eq!(resolve_under(root, "").unwrap(), PathBuf::from("/b/1/src"));
        assert_eq!(
            resolve_under(root, "./x/../y").unwrap(),
            PathBuf::from("/b/1/src/y")
        );
    }

    #[test]
    fn test_resolve_under_refuses_escapes() {
        let root = Path::new("/b/1/src");
        assert!(resolve_under(root, "../secret").is_none());
        assert!(resolve_under(root, "a/../../secret").is_none());
        assert!(resolve_under(root, "/etc/passwd").is_none());
    }
}
