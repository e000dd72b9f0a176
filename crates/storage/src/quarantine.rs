//! Quarantine storage backend
//!
//! New writes land under a quarantine root; nothing becomes part of the
//! permanent tree until it is explicitly persisted. Reads resolve against
//! the root selected by the caller's `is_persisted` flag, so a workspace
//! can straddle both roots mid-request. Persisting a file is atomic from
//! the workspace's point of view: it is a rename when both roots share a
//! filesystem, and copy-then-delete otherwise.

use chrono::{DateTime, Utc};
use sourcemill_core::{path as relpath, Error, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::adapter::{PathContext, StorageAdapter};
use crate::fsops;
use crate::paths::WorkspacePaths;
use crate::simple::{ioerr, resolve_in_base, DIR_MODE, FILE_MODE};

/// Storage split across a quarantine root and a permanent root.
#[derive(Debug, Clone)]
pub struct QuarantineStorage {
    quarantine: PathBuf,
    permanent: PathBuf,
}

impl QuarantineStorage {
    /// Create a backend with the given quarantine and permanent roots.
    pub fn new(quarantine: impl Into<PathBuf>, permanent: impl Into<PathBuf>) -> Self {
        QuarantineStorage {
            quarantine: quarantine.into(),
            permanent: permanent.into(),
        }
    }

    /// The root where unpersisted writes land.
    pub fn quarantine_base(&self) -> &Path {
        &self.quarantine
    }

    /// The root holding persisted files.
    pub fn permanent_base(&self) -> &Path {
        &self.permanent
    }

    fn base_for(&self, ctx: &PathContext) -> &Path {
        if ctx.is_persisted {
            &self.permanent
        } else {
            &self.quarantine
        }
    }

    fn resolve(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Option<PathBuf> {
        resolve_in_base(self.base_for(ctx), upload_id, rel, ctx)
    }

    fn resolved(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<PathBuf> {
        self.resolve(upload_id, rel, ctx)
            .ok_or_else(|| Error::unsafe_path(rel))
    }
}

impl StorageAdapter for QuarantineStorage {
    fn workspace_paths(&self, upload_id: u64) -> WorkspacePaths {
        WorkspacePaths::new(&self.quarantine, upload_id)
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
        // The removed area always lives in the quarantine root; removal is
        // itself a pending change until the workspace persists.
        let removed_dir = WorkspacePaths::new(&self.quarantine, upload_id).removed_dir();
        let flat = relpath::flatten(rel);
        debug!(upload_id, path = rel, "moving file to removed area");
        fsops::move_to_removed(&src, &removed_dir, &flat).map_err(|e| ioerr("remove", &src, e))
    }

    fn delete(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<()> {
        let path = self.resolved(upload_id, rel, ctx)?;
        fsops::delete_tree(&path).map_err(|e| ioerr("delete", &path, e))
    }

    fn delete_workspace(&self, upload_id: u64) -> Result<()> {
        for base in [&self.quarantine, &self.permanent] {
            let dir = WorkspacePaths::new(base, upload_id).workspace_dir();
            if dir.exists() {
                std::fs::remove_dir_all(&dir).map_err(|e| ioerr("delete workspace", &dir, e))?;
            }
        }
        Ok(())
    }

    fn persist(&self, upload_id: u64, rel: &str, ctx: &PathContext) -> Result<()> {
        if ctx.is_persisted {
            return Ok(());
        }
        let src = self.resolved(upload_id, rel, ctx)?;
        let persisted_ctx = PathContext {
            is_persisted: true,
            ..*ctx
        };
        let dst = self.resolved(upload_id, rel, &persisted_ctx)?;
        debug!(upload_id, path = rel, "persisting file out of quarantine");
        fsops::rename_replace(&src, &dst).map_err(|e| ioerr("persist", &src, e))
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
        for base in [&self.quarantine, &self.permanent] {
            let dir = WorkspacePaths::new(base, upload_id).workspace_dir();
            fsops::set_tree_permissions(&dir, FILE_MODE, DIR_MODE)
                .map_err(|e| ioerr("set permissions", &dir, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn storage() -> (tempfile::TempDir, tempfile::TempDir, QuarantineStorage) {
        let q = tempdir().unwrap();
        let p = tempdir().unwrap();
        let s = QuarantineStorage::new(q.path(), p.path());
        (q, p, s)
    }

    #[test]
    fn test_writes_land_in_quarantine() {
        let (q, p, s) = storage();
        let ctx = PathContext::source();
        s.write_all(3, "main.tex", &ctx, b"x").unwrap();
        assert!(q.path().join("3/src/main.tex").exists());
        assert!(!p.path().join("3/src/main.tex").exists());
    }

    #[test]
    fn test_persist_promotes_to_permanent() {
        let (q, p, s) = storage();
        let ctx = PathContext::source();
        s.write_all(3, "main.tex", &ctx, b"x").unwrap();
        s.persist(3, "main.tex", &ctx).unwrap();
        assert!(!q.path().join("3/src/main.tex").exists());
        assert_eq!(
            std::fs::read(p.path().join("3/src/main.tex")).unwrap(),
            b"x"
        );

        // Reads now resolve through the persisted flag.
        let persisted = PathContext {
            is_persisted: true,
            ..PathContext::source()
        };
        assert!(s.exists(3, "main.tex", &persisted));
        assert!(!s.exists(3, "main.tex", &ctx));
    }

    #[test]
    fn test_persist_on_persisted_is_noop() {
        let (_q, p, s) = storage();
        let ctx = PathContext {
            is_persisted: true,
            ..PathContext::source()
        };
        std::fs::create_dir_all(p.path().join("3/src")).unwrap();
        std::fs::write(p.path().join("3/src/a.tex"), b"x").unwrap();
        s.persist(3, "a.tex", &ctx).unwrap();
        assert!(p.path().join("3/src/a.tex").exists());
    }

    #[test]
    fn test_safety_applies_in_both_roots() {
        let (_q, _p, s) = storage();
        assert!(!s.is_safe(3, "../other", &PathContext::source()));
        let persisted = PathContext {
            is_persisted: true,
            ..PathContext::source()
        };
        assert!(!s.is_safe(3, "../other", &persisted));
    }

    #[test]
    fn test_delete_workspace_clears_both_roots() {
        let (q, p, s) = storage();
        let ctx = PathContext::source();
        s.write_all(3, "a.tex", &ctx, b"x").unwrap();
        s.persist(3, "a.tex", &ctx).unwrap();
        s.write_all(3, "b.tex", &ctx, b"y").unwrap();
        s.delete_workspace(3).unwrap();
        assert!(!q.path().join("3").exists());
        assert!(!p.path().join("3").exists());
    }

    #[test]
    fn test_removed_area_stays_in_quarantine() {
        let (q, _p, s) = storage();
        let ctx = PathContext::source();
        s.write_all(3, "figs/a.pdf", &ctx, b"pdf").unwrap();
        let name = s.remove(3, "figs/a.pdf", &ctx).unwrap();
        assert_eq!(name, "figs_a.pdf");
        assert!(q.path().join("3/removed/figs_a.pdf").exists());
    }
}
