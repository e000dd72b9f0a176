//! Single-root storage backend
//!
//! Workspaces live directly under one base directory. This is the backend
//! for deployments where the upload filesystem is durable on its own.

use chrono::{DateTime, Utc};
use sourcemill_core::{path as relpath, Error, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::adapter::{PathContext, StorageAdapter};
use crate::fsops;
use crate::paths::{WorkspacePaths, ANCILLARY_PREFIX};

/// Permission bits applied to files by `set_permissions`.
pub const FILE_MODE: u32 = 0o664;
/// Permission bits applied to directories by `set_permissions`.
pub const DIR_MODE: u32 = 0o775;

/// Storage rooted at a single base directory.
#[derive(Debug, Clone)]
pub struct SimpleStorage {
    base: PathBuf,
}

impl SimpleStorage {
    /// Create a backend rooted at `base`. The directory is created on
    /// first use, not here.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        SimpleStorage { base: base.into() }
    }

    /// The base directory holding all workspaces.
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn resolve(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Option<PathBuf> {
        resolve_in_base(&self.base, upload_id, rel, ctx)
    }

    fn resolved(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<PathBuf> {
        self.resolve(upload_id, rel, ctx)
            .ok_or_else(|| Error::unsafe_path(rel))
    }
}

/// Shared resolution: area root + lexical normalization + the ancillary
/// containment rule.
pub(crate) fn resolve_in_base(
    base: &Path,
    upload_id: u64,
    rel: &str,
    ctx: &PathContext,
) -> Option<PathBuf> {
    let ws = WorkspacePaths::new(base, upload_id);
    let root = ws.area_root(ctx.area());
    let normalized = relpath::normalize(rel)?;
    if ctx.is_ancillary && !ctx.is_removed && !ctx.is_system {
        let in_anc =
            normalized == ANCILLARY_PREFIX || normalized.starts_with("anc/");
        if !in_anc {
            return None;
        }
    }
    if normalized.is_empty() {
        Some(root)
    } else {
        Some(root.join(normalized))
    }
}

pub(crate) fn ioerr(op: &str, path: &Path, e: io::Error) -> Error {
    Error::storage_with_source(format!("{} {}", op, path.display()), e)
}

impl StorageAdapter for SimpleStorage {
    fn workspace_paths(&self, upload_id: u64) -> WorkspacePaths {
        WorkspacePaths::new(&self.base, upload_id)
    }

    fn is_safe(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> bool {
        self.resolve(upload_id, rel, ctx).is_some()
    }

    fn full_path(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<PathBuf> {
        self.resolved(upload_id, rel, ctx)
    }

    fn create(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<()> {
        let path = self.resolved(upload_id, rel, ctx)?;
        fsops::create_file(&path).map_err(|e| ioerr("create", &path, e))
    }

    fn makedirs(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<()> {
        let path = self.resolved(upload_id, rel, ctx)?;
        std::fs::create_dir_all(&path).map_err(|e| ioerr("makedirs", &path, e))
    }

    fn open_read(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<File> {
        let path = self.resolved(upload_id, rel, ctx)?;
        fsops::open_read(&path).map_err(|e| ioerr("open", &path, e))
    }

    fn open_write(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<File> {
        let path = self.resolved(upload_id, rel, ctx)?;
        fsops::open_write(&path).map_err(|e| ioerr("open for write", &path, e))
    }

    fn open_append(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<File> {
        let path = self.resolved(upload_id, rel, ctx)?;
        fsops::open_append(&path).map_err(|e| ioerr("open for append", &path, e))
    }

    fn exists(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> bool {
        self.resolve(upload_id, rel, ctx)
            .map(|p| p.exists())
            .unwrap_or(false)
    }

    fn size_bytes(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<u64> {
        let path = self.resolved(upload_id, rel, ctx)?;
        let meta = std::fs::metadata(&path).map_err(|e| ioerr("stat", &path, e))?;
        Ok(meta.len())
    }

    fn last_modified(
        &self,
        upload_id: u64,
        rel: &str,
        ctx: &PathContext,
    ) -> Result<DateTime<Utc>> {
        let path = self.resolved(upload_id, rel, ctx)?;
        let meta = std::fs::metadata(&path).map_err(|e| ioerr("stat", &path, e))?;
        let mtime = meta.modified().map_err(|e| ioerr("stat", &path, e))?;
        Ok(DateTime::<Utc>::from(mtime))
    }

    fn touch(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<()> {
        let path = self.resolved(upload_id, rel, ctx)?;
        fsops::touch_now(&path).map_err(|e| ioerr("touch", &path, e))
    }

    fn copy(
        &self,
        upload_id: u64,
        from: &str,
        from_ctx: &PathContext,
        to: &str,
        to_ctx: &PathContext,
    ) -> Result<()> {
        let src = self.resolved(upload_id, from, from_ctx)?;
        let dst = self.resolved(upload_id, to, to_ctx)?;
        fsops::copy_file(&src, &dst).map_err(|e| ioerr("copy", &src, e))
    }

    fn rename(
        &self,
        upload_id: u64,
        from: &str,
        from_ctx: &PathContext,
        to: &str,
        to_ctx: &PathContext,
    ) -> Result<()> {
        let src = self.resolved(upload_id, from, from_ctx)?;
        let dst = self.resolved(upload_id, to, to_ctx)?;
        fsops::rename_replace(&src, &dst).map_err(|e| ioerr("rename", &src, e))
    }

    fn remove(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<String> {
        let src = self.resolved(upload_id, rel, ctx)?;
        let removed_dir = self.workspace_paths(upload_id).removed_dir();
        let flat = relpath::flatten(rel);
        debug!(upload_id, path = rel, "moving file to removed area");
        fsops::move_to_removed(&src, &removed_dir, &flat).map_err(|e| ioerr("remove", &src, e))
    }

    fn delete(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<()> {
        let path = self.resolved(upload_id, rel, ctx)?;
        fsops::delete_tree(&path).map_err(|e| ioerr("delete", &path, e))
    }

    fn delete_workspace(&self, upload_id: u64) -> Result<()> {
        let dir = self.workspace_paths(upload_id).workspace_dir();
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| ioerr("delete workspace", &dir, e))?;
        }
        Ok(())
    }

    fn persist(&self, _upload_id: u64, _rel: &str, _ctx: &PathContext) -> Result<()> {
        // Single-root storage is already durable.
        Ok(())
    }

    fn cmp(
        &self,
        upload_id: u64,
        a: &str,
        a_ctx: &PathContext,
        b: &str,
        b_ctx: &PathContext,
    ) -> Result<bool> {
        let pa = self.resolved(upload_id, a, a_ctx)?;
        let pb = self.resolved(upload_id, b, b_ctx)?;
        fsops::cmp_files(&pa, &pb).map_err(|e| ioerr("compare", &pa, e))
    }

    fn is_tarfile(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> bool {
        self.resolve(upload_id, rel, ctx)
            .map(|p| fsops::probe_tar_family(&p))
            .unwrap_or(false)
    }

    fn set_permissions(&self, upload_id: u64) -> Result<()> {
        let dir = self.workspace_paths(upload_id).workspace_dir();
        fsops::set_tree_permissions(&dir, FILE_MODE, DIR_MODE)
            .map_err(|e| ioerr("set permissions", &dir, e))
    }
}
