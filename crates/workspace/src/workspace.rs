//! The upload workspace aggregate
//!
//! A [`Workspace`] binds the storage adapter, file index, diagnostics,
//! source log, source package, and check pipeline behind one object with a
//! lifecycle state machine:
//!
//! ```text
//! status:    active --release()--> released --unrelease()--> active
//!            active --destroy()--> deleted (terminal)
//! lock:      unlocked <-> locked
//! ```
//!
//! While released or locked, every mutating operation is refused with
//! `workspace_not_writable`; reads and the download of an already-built
//! source package still succeed.

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use sourcemill_core::{
    path as relpath, Diagnostic, DiagnosticList, Error, FileType, LockState, Readiness, Result,
    Severity, SourceType, Status,
};
use sourcemill_storage::{PathContext, StorageAdapter, WorkspacePaths};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;

use crate::checker::{Checker, CheckingStrategy, SynchronousCheckingStrategy};
use crate::file::{CreateOptions, UserFile};
use crate::index::{FileIndex, IterOptions};
use crate::log::SourceLog;
use crate::package::SourcePackage;
use crate::record::{FileRecord, WorkspaceRecord};

/// The root aggregate for one upload workspace.
pub struct Workspace {
    upload_id: u64,
    owner_user_id: String,
    submission_id: Option<String>,
    created_datetime: DateTime<Utc>,
    modified_datetime: DateTime<Utc>,
    lastupload_start_datetime: Option<DateTime<Utc>>,
    lastupload_completion_datetime: Option<DateTime<Utc>>,
    source_type: SourceType,
    status: Status,
    lock_state: LockState,
    index: FileIndex,
    diagnostics: DiagnosticList,
    storage: Arc<dyn StorageAdapter>,
    log: SourceLog,
    checkers: Vec<Box<dyn Checker>>,
    strategy: Box<dyn CheckingStrategy>,
    epoch: u64,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("upload_id", &self.upload_id)
            .field("status", &self.status)
            .field("lock_state", &self.lock_state)
            .field("source_type", &self.source_type)
            .field("files", &self.index.file_count())
            .finish()
    }
}

impl Workspace {
    fn bind(
        storage: Arc<dyn StorageAdapter>,
        upload_id: u64,
        owner_user_id: impl Into<String>,
    ) -> Result<Self> {
        storage.makedirs(upload_id, "", &PathContext::source())?;
        let log = SourceLog::new(storage.clone(), upload_id)?;
        let now = Utc::now();
        Ok(Workspace {
            upload_id,
            owner_user_id: owner_user_id.into(),
            submission_id: None,
            created_datetime: now,
            modified_datetime: now,
            lastupload_start_datetime: None,
            lastupload_completion_datetime: None,
            source_type: SourceType::Unknown,
            status: Status::Active,
            lock_state: LockState::Unlocked,
            index: FileIndex::new(),
            diagnostics: DiagnosticList::new(),
            storage,
            log,
            checkers: Vec::new(),
            strategy: Box::new(SynchronousCheckingStrategy::new()),
            epoch: 0,
        })
    }

    /// Create a fresh workspace on disk for `upload_id`.
    pub fn create(
        storage: Arc<dyn StorageAdapter>,
        upload_id: u64,
        owner_user_id: impl Into<String>,
    ) -> Result<Self> {
        let ws = Workspace::bind(storage, upload_id, owner_user_id)?;
        ws.log.info(&format!("Created workspace {}", upload_id))?;
        Ok(ws)
    }

    /// Bind to an existing workspace, rebuilding the index from disk.
    pub fn open(
        storage: Arc<dyn StorageAdapter>,
        upload_id: u64,
        owner_user_id: impl Into<String>,
    ) -> Result<Self> {
        let paths = storage.workspace_paths(upload_id);
        if !paths.workspace_dir().exists() {
            return Err(Error::WorkspaceNotFound { upload_id });
        }
        let mut ws = Workspace::bind(storage, upload_id, owner_user_id)?;
        ws.refresh_index_from_disk()?;
        Ok(ws)
    }

    /// Attach the checker list applied by `perform_checks`.
    pub fn with_checkers(mut self, checkers: Vec<Box<dyn Checker>>) -> Self {
        self.checkers = checkers;
        self
    }

    /// Replace the checking strategy.
    pub fn with_strategy(mut self, strategy: Box<dyn CheckingStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    // ------------------------------------------------------------------
    // Read-only views
    // ------------------------------------------------------------------

    /// The workspace's immutable id.
    pub fn upload_id(&self) -> u64 {
        self.upload_id
    }

    /// Identifier of the owning user.
    pub fn owner_user_id(&self) -> &str {
        &self.owner_user_id
    }

    /// External submission id, when associated.
    pub fn submission_id(&self) -> Option<&str> {
        self.submission_id.as_deref()
    }

    /// Associate an external submission id.
    pub fn set_submission_id(&mut self, id: impl Into<String>) {
        self.submission_id = Some(id.into());
    }

    /// When the workspace was created (UTC).
    pub fn created_datetime(&self) -> DateTime<Utc> {
        self.created_datetime
    }

    /// When the file index last changed (UTC).
    pub fn modified_datetime(&self) -> DateTime<Utc> {
        self.modified_datetime
    }

    /// When the last upload began.
    pub fn lastupload_start_datetime(&self) -> Option<DateTime<Utc>> {
        self.lastupload_start_datetime
    }

    /// When the last upload finished processing.
    pub fn lastupload_completion_datetime(&self) -> Option<DateTime<Utc>> {
        self.lastupload_completion_datetime
    }

    /// Aggregate source classification.
    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    /// Set the aggregate source classification (checkers only).
    pub fn set_source_type(&mut self, source_type: SourceType) {
        self.source_type = source_type;
    }

    /// Activity status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Lock state.
    pub fn lock_state(&self) -> LockState {
        self.lock_state
    }

    /// The file index.
    pub fn index(&self) -> &FileIndex {
        &self.index
    }

    /// The diagnostics collection.
    pub fn diagnostics(&self) -> &DiagnosticList {
        &self.diagnostics
    }

    /// The append-only source log.
    pub fn log(&self) -> &SourceLog {
        &self.log
    }

    /// The storage adapter.
    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    /// Directory layout of this workspace.
    pub fn paths(&self) -> WorkspacePaths {
        self.storage.workspace_paths(self.upload_id)
    }

    /// Monotonic mutation counter; bumps on every index mutation.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Total bytes across live source and ancillary files.
    pub fn total_size_bytes(&self) -> u64 {
        self.index.total_size_bytes()
    }

    /// Whether mutations are currently permitted.
    pub fn is_writable(&self) -> bool {
        self.status == Status::Active && self.lock_state == LockState::Unlocked
    }

    fn assert_writable(&self) -> Result<()> {
        if self.status != Status::Active {
            return Err(Error::not_writable(self.status.as_str()));
        }
        if self.lock_state == LockState::Locked {
            return Err(Error::not_writable("locked"));
        }
        Ok(())
    }

    /// Derived readiness: fatal persistent diagnostics on the workspace or
    /// any non-removed file force `Errors`; otherwise any applicable
    /// warning yields `ReadyWithWarnings`.
    pub fn readiness(&self) -> Readiness {
        let live = |p: &str| self.index.contains(p);
        if self.diagnostics.has_fatal_persistent(live) {
            Readiness::Errors
        } else if self.diagnostics.has_warnings(live) {
            Readiness::ReadyWithWarnings
        } else {
            Readiness::Ready
        }
    }

    // ------------------------------------------------------------------
    // File operations
    // ------------------------------------------------------------------

    /// Look up a live file.
    pub fn file(&self, path: &str) -> Result<&UserFile> {
        self.index
            .get(path)
            .ok_or_else(|| Error::file_not_found(path))
    }

    /// Whether a live file exists at `path`.
    pub fn exists(&self, path: &str) -> bool {
        self.index.contains(path)
    }

    /// Iterate live files per the filter.
    pub fn iter_files(&self, opts: IterOptions) -> Vec<&UserFile> {
        self.index.iter(opts).collect()
    }

    /// Children of a directory, down to `max_depth` levels.
    pub fn iter_children(&self, dir: &str, max_depth: usize) -> Vec<&UserFile> {
        self.index.iter_children(dir, max_depth).collect()
    }

    fn touch_modified(&mut self) {
        self.modified_datetime = Utc::now();
        self.epoch += 1;
    }

    /// Register a new file, creating parent directories as needed.
    pub fn create_file(&mut self, path: &str, opts: &CreateOptions) -> Result<()> {
        self.assert_writable()?;
        let normalized = relpath::normalize(path).ok_or_else(|| {
            self.diagnostics.add(Diagnostic::fatal(
                "storage_failed",
                path,
                format!("Unsafe path refused: '{}'", path),
            ));
            Error::unsafe_path(path)
        })?;

        let is_ancillary = if opts.is_system {
            false
        } else {
            opts.is_ancillary
                .unwrap_or_else(|| normalized == "anc" || normalized.starts_with("anc/"))
        };
        let ctx = PathContext {
            is_ancillary,
            is_system: opts.is_system,
            ..Default::default()
        };
        if !self.storage.is_safe(self.upload_id, &normalized, &ctx) {
            self.diagnostics.add(Diagnostic::fatal(
                "storage_failed",
                &normalized,
                format!("Unsafe path refused: '{}'", normalized),
            ));
            return Err(Error::unsafe_path(normalized));
        }

        if opts.is_directory {
            self.storage.makedirs(self.upload_id, &normalized, &ctx)?;
        } else if opts.touch {
            self.storage.create(self.upload_id, &normalized, &ctx)?;
        } else if !self.storage.exists(self.upload_id, &normalized, &ctx) {
            return Err(Error::file_not_found(normalized));
        }

        // Register intermediate directories so directory-level checks see
        // them.
        if !opts.is_system {
            let mut dir = relpath::parent(&normalized).to_string();
            while !dir.is_empty() && dir != "anc" && !self.index.contains(&dir) {
                let mut entry = UserFile::directory(dir.clone());
                entry.is_ancillary = is_ancillary;
                self.index.insert(entry);
                dir = relpath::parent(&dir).to_string();
            }
        }

        let mut entry = if opts.is_directory {
            UserFile::directory(normalized.clone())
        } else if opts.is_system {
            UserFile::system(normalized.clone())
        } else {
            UserFile::new(normalized.clone())
        };
        entry.is_ancillary = is_ancillary && !opts.is_system;
        if let Some(t) = opts.file_type {
            entry.file_type = t;
        }
        if !opts.is_directory {
            entry.size_bytes = self
                .storage
                .size_bytes(self.upload_id, &normalized, &ctx)
                .unwrap_or(0);
            entry.last_modified = self
                .storage
                .last_modified(self.upload_id, &normalized, &ctx)
                .ok();
        }
        self.index.insert(entry);
        self.touch_modified();
        Ok(())
    }

    /// Open a live file for reading.
    pub fn open_file(&self, path: &str) -> Result<File> {
        let ctx = self.file(path)?.path_context();
        self.storage.open_read(self.upload_id, path, &ctx)
    }

    /// Read a live file's contents.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let ctx = self.file(path)?.path_context();
        self.storage.read_to_vec(self.upload_id, path, &ctx)
    }

    /// Replace a live file's contents and refresh its index entry.
    pub fn write_file(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        let ctx = self.file(path)?.path_context();
        self.storage.write_all(self.upload_id, path, &ctx, bytes)?;
        self.refresh_entry(path)?;
        Ok(())
    }

    /// Re-stat a live file into its index entry.
    pub fn refresh_entry(&mut self, path: &str) -> Result<()> {
        let ctx = self.file(path)?.path_context();
        let size = self.storage.size_bytes(self.upload_id, path, &ctx)?;
        let mtime = self.storage.last_modified(self.upload_id, path, &ctx).ok();
        if let Some(entry) = self.index.get_mut(path) {
            entry.size_bytes = size;
            entry.last_modified = mtime;
        }
        Ok(())
    }

    /// Absolute path of a live file.
    pub fn full_path(&self, path: &str) -> Result<PathBuf> {
        let ctx = self.file(path)?.path_context();
        self.storage.full_path(self.upload_id, path, &ctx)
    }

    /// Absolute path for an arbitrary source-area relative path.
    pub fn area_full_path(&self, rel: &str, is_ancillary: bool) -> Result<PathBuf> {
        let ctx = PathContext {
            is_ancillary,
            ..Default::default()
        };
        self.storage.full_path(self.upload_id, rel, &ctx)
    }

    /// Whether `rel` is safe to materialize in the source area.
    pub fn is_safe_for(&self, rel: &str, is_ancillary: bool, is_persisted: bool) -> bool {
        let ctx = PathContext {
            is_ancillary,
            is_persisted,
            ..Default::default()
        };
        self.storage.is_safe(self.upload_id, rel, &ctx)
    }

    /// Whether the file opens as a tar-family archive.
    pub fn is_tarfile(&self, path: &str) -> bool {
        match self.file(path) {
            Ok(f) => self
                .storage
                .is_tarfile(self.upload_id, path, &f.path_context()),
            Err(_) => false,
        }
    }

    /// Set a live file's detected type. Bumps the epoch only when the
    /// type actually changes, so repeated inference converges.
    pub fn set_file_type(&mut self, path: &str, file_type: FileType) -> Result<()> {
        let entry = self
            .index
            .get_mut(path)
            .ok_or_else(|| Error::file_not_found(path))?;
        if entry.file_type != file_type {
            entry.file_type = file_type;
            self.epoch += 1;
        }
        Ok(())
    }

    /// Flag a live file as ancillary, re-homing its index entry.
    pub fn mark_ancillary(&mut self, path: &str) -> Result<()> {
        let mut entry = self
            .index
            .delete(path)
            .ok_or_else(|| Error::file_not_found(path))?;
        if !entry.is_ancillary {
            entry.is_ancillary = true;
            self.epoch += 1;
        }
        self.index.insert(entry);
        Ok(())
    }

    /// Move a live file aside to the removed area, recording `reason`.
    pub fn remove(&mut self, path: &str, reason: &str) -> Result<()> {
        self.assert_writable()?;
        let entry = self.file(path)?;
        let ctx = entry.path_context();
        self.storage.remove(self.upload_id, path, &ctx)?;
        self.index.mark_removed(path, reason)?;
        self.log.info(&format!("Removed file '{}': {}", path, reason))?;
        self.touch_modified();
        Ok(())
    }

    /// Permanently delete a live file or directory.
    pub fn delete(&mut self, path: &str) -> Result<()> {
        self.assert_writable()?;
        let entry = self.file(path)?;
        let ctx = entry.path_context();
        let is_directory = entry.is_directory;
        self.storage.delete(self.upload_id, path, &ctx)?;
        self.index.delete(path);
        if is_directory {
            let prefix = format!("{}/", path.trim_end_matches('/'));
            for child in self
                .index
                .paths(IterOptions::client_view())
                .into_iter()
                .filter(|p| p.starts_with(&prefix))
            {
                self.index.delete(&child);
                self.diagnostics.remove_for_path(&child);
            }
        }
        self.diagnostics.remove_for_path(path);
        self.log.info(&format!("Deleted file '{}'", path))?;
        self.touch_modified();
        Ok(())
    }

    /// Delete every client file, clearing the index and diagnostics.
    pub fn delete_all_files(&mut self) -> Result<()> {
        self.assert_writable()?;
        let src_ctx = PathContext::source();
        if self.storage.exists(self.upload_id, "", &src_ctx) {
            self.storage.delete(self.upload_id, "", &src_ctx)?;
        }
        self.storage.makedirs(self.upload_id, "", &src_ctx)?;
        self.index.clear_live();
        self.diagnostics.clear();
        self.source_type = SourceType::Unknown;
        // The packed tarball derives from contents that no longer exist.
        self.source_package().remove()?;
        self.log.info("Deleted all files")?;
        self.touch_modified();
        Ok(())
    }

    /// Rename a live file, updating storage, the index, and diagnostics.
    /// Returns the normalized new path.
    pub fn rename(&mut self, path: &str, new_path: &str) -> Result<String> {
        self.assert_writable()?;
        let ctx = self.file(path)?.path_context();
        let normalized = relpath::normalize(new_path).ok_or_else(|| Error::unsafe_path(new_path))?;
        if !self.storage.is_safe(self.upload_id, &normalized, &ctx) {
            return Err(Error::unsafe_path(normalized));
        }
        self.storage
            .rename(self.upload_id, path, &ctx, &normalized, &ctx)?;
        self.index.rename(path, &normalized)?;
        self.diagnostics.rekey_path(path, &normalized);
        self.log
            .info(&format!("Renamed '{}' to '{}'", path, normalized))?;
        self.touch_modified();
        Ok(normalized)
    }

    /// Promote a repair file over the original: the replacement's bytes
    /// land at the original's path and the replacement entry disappears.
    pub fn replace(&mut self, original: &str, replacement: &str) -> Result<()> {
        self.assert_writable()?;
        let orig_ctx = self.file(original)?.path_context();
        let repl_ctx = self.file(replacement)?.path_context();
        self.storage
            .rename(self.upload_id, replacement, &repl_ctx, original, &orig_ctx)?;
        self.index.delete(replacement);
        self.refresh_entry(original)?;
        self.touch_modified();
        Ok(())
    }

    /// Promote every live file out of quarantine.
    pub fn persist_all(&mut self) -> Result<()> {
        let paths = self.index.paths(IterOptions::client_view());
        for path in paths {
            let ctx = match self.index.get(&path) {
                Some(f) if !f.is_directory && !f.is_persisted => f.path_context(),
                _ => continue,
            };
            self.storage.persist(self.upload_id, &path, &ctx)?;
            if let Some(entry) = self.index.get_mut(&path) {
                entry.is_persisted = true;
            }
        }
        Ok(())
    }

    /// Rebuild the live index from what is on disk under the source area.
    pub fn refresh_index_from_disk(&mut self) -> Result<()> {
        self.index.clear_live();
        let src = self.paths().source_dir();
        if !src.exists() {
            return Ok(());
        }
        let walker = walkdir::WalkDir::new(&src)
            .follow_links(false)
            .sort_by_file_name();
        for entry in walker {
            let entry =
                entry.map_err(|e| Error::storage(format!("walk source area: {}", e)))?;
            if entry.path() == src {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&src)
                .map_err(|e| Error::storage(format!("relativize: {}", e)))?
                .to_string_lossy()
                .replace('\\', "/");
            let mut file = if entry.file_type().is_dir() {
                UserFile::directory(rel.clone())
            } else {
                UserFile::new(rel.clone())
            };
            file.is_ancillary = rel == "anc" || rel.starts_with("anc/");
            if !entry.file_type().is_dir() {
                let meta = entry
                    .metadata()
                    .map_err(|e| Error::storage(format!("stat {}: {}", rel, e)))?;
                file.size_bytes = meta.len();
                file.last_modified = meta.modified().ok().map(DateTime::<Utc>::from);
            }
            self.index.insert(file);
        }
        self.touch_modified();
        Ok(())
    }

    /// Set `is_checked` on every live file (end of a check pass).
    pub fn mark_all_checked(&mut self) {
        for path in self.index.paths(IterOptions::client_view()) {
            if let Some(f) = self.index.get_mut(&path) {
                f.is_checked = true;
            }
        }
    }

    /// Live paths a check pass visits: source and ancillary entries,
    /// directories included, in index order.
    pub fn live_check_paths(&self) -> Vec<String> {
        self.index.paths(IterOptions::client_view())
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Add a prepared diagnostic.
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.add(diagnostic);
    }

    /// Attach a fatal, persistent error to a file.
    pub fn add_error(&mut self, path: &str, code: &str, message: impl Into<String>) {
        self.diagnostics.add(Diagnostic::fatal(code, path, message));
    }

    /// Attach an error with explicit severity and persistence.
    pub fn add_error_with(
        &mut self,
        path: &str,
        code: &str,
        message: impl Into<String>,
        severity: Severity,
        is_persistent: bool,
    ) {
        self.diagnostics.add(Diagnostic {
            severity,
            code: code.to_string(),
            path: path.to_string(),
            message: message.into(),
            is_persistent,
        });
    }

    /// Attach a persistent warning to a file.
    pub fn add_warning(&mut self, path: &str, code: &str, message: impl Into<String>) {
        self.diagnostics
            .add(Diagnostic::warning(code, path, message));
    }

    /// Attach a warning cleared at the next check pass.
    pub fn add_warning_non_persistent(
        &mut self,
        path: &str,
        code: &str,
        message: impl Into<String>,
    ) {
        self.diagnostics
            .add(Diagnostic::warning(code, path, message).persistent(false));
    }

    /// Attach an informational note to a file.
    pub fn add_info(&mut self, path: &str, code: &str, message: impl Into<String>) {
        self.diagnostics.add(Diagnostic::info(code, path, message));
    }

    /// Attach a workspace-level warning.
    pub fn add_non_file_warning(&mut self, code: &str, message: impl Into<String>) {
        self.diagnostics.add(Diagnostic::warning(code, "", message));
    }

    /// Attach a workspace-level fatal error.
    pub fn add_non_file_error(&mut self, code: &str, message: impl Into<String>) {
        self.diagnostics.add(Diagnostic::fatal(code, "", message));
    }

    /// Drop a resolved diagnostic.
    pub fn resolve_diagnostic(&mut self, code: &str, path: &str) {
        self.diagnostics.resolve(code, path);
    }

    /// Append a line to the source log.
    pub fn log_info(&self, message: &str) {
        // Logging failures must never abort a check.
        if let Err(e) = self.log.info(message) {
            debug!(upload_id = self.upload_id, error = %e, "source log write failed");
        }
    }

    // ------------------------------------------------------------------
    // Checks
    // ------------------------------------------------------------------

    /// Run the configured checker list until a pass is idempotent.
    ///
    /// Non-persistent diagnostics are cleared at entry. Checker findings
    /// are accumulated as diagnostics; only storage faults abort.
    pub fn perform_checks(&mut self) -> Result<()> {
        self.assert_writable()?;
        self.diagnostics.clear_non_persistent();
        let checkers = std::mem::take(&mut self.checkers);
        let strategy = std::mem::replace(
            &mut self.strategy,
            Box::new(SynchronousCheckingStrategy::new()),
        );
        let result = strategy.check(self, &checkers);
        self.checkers = checkers;
        self.strategy = strategy;
        result
    }

    /// Deposit a payload and run the full check pipeline over the
    /// workspace.
    pub fn upload(&mut self, name: &str, payload: &[u8], ancillary: bool) -> Result<()> {
        self.assert_writable()?;
        self.lastupload_start_datetime = Some(Utc::now());

        let base = relpath::basename(name);
        if base.is_empty() {
            return Err(Error::unsafe_path(name));
        }
        let rel = if ancillary {
            format!("anc/{}", base)
        } else {
            base.to_string()
        };
        self.create_file(&rel, &CreateOptions::touch())?;
        self.write_file(&rel, payload)?;
        self.log.info(&format!(
            "Deposited '{}' ({} bytes){}",
            rel,
            payload.len(),
            if ancillary { " [ancillary]" } else { "" }
        ))?;

        self.perform_checks()?;
        self.storage.set_permissions(self.upload_id)?;
        self.lastupload_completion_datetime = Some(Utc::now());
        info!(
            upload_id = self.upload_id,
            file = %rel,
            readiness = %self.readiness(),
            "upload processed"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Source package
    // ------------------------------------------------------------------

    /// The derived source package for this workspace.
    pub fn source_package(&self) -> SourcePackage {
        SourcePackage::new(self.storage.clone(), self.upload_id)
    }

    /// Build the source package now. Refused while not writable.
    pub fn pack_content(&self) -> Result<PathBuf> {
        self.assert_writable()?;
        self.source_package().pack()
    }

    /// Open the source package for download. While locked or released,
    /// only an already-built package can be served.
    pub fn get_content(&self) -> Result<File> {
        let package = self.source_package();
        if self.is_writable() {
            package.open()
        } else if package.exists() {
            Ok(File::open(package.path())?)
        } else {
            Err(Error::NoContentToPack)
        }
    }

    /// Checksum of the source package, rebuilding only when writable.
    pub fn content_checksum(&self) -> Result<Option<String>> {
        let package = self.source_package();
        if self.is_writable() {
            package.checksum()
        } else {
            package.checksum_existing()
        }
    }

    /// Whether the package file exists.
    pub fn content_package_exists(&self) -> bool {
        self.source_package().exists()
    }

    /// Whether the package is stale relative to the source area.
    pub fn content_package_stale(&self) -> bool {
        self.source_package().stale()
    }

    /// Package size in bytes; builds on demand only when writable.
    pub fn content_package_size(&self) -> Result<u64> {
        let package = self.source_package();
        if self.is_writable() {
            package.size_bytes()
        } else if package.exists() {
            Ok(std::fs::metadata(package.path())?.len())
        } else {
            Ok(0)
        }
    }

    /// Package mtime; errors when absent.
    pub fn content_package_modified(&self) -> Result<DateTime<Utc>> {
        self.source_package().modified()
    }

    // ------------------------------------------------------------------
    // Per-file content access
    // ------------------------------------------------------------------

    /// Size of one live file.
    pub fn content_file_size(&self, path: &str) -> Result<u64> {
        Ok(self.file(path)?.size_bytes)
    }

    /// Last-modified time of one live file.
    pub fn content_file_last_modified(&self, path: &str) -> Result<DateTime<Utc>> {
        let ctx = self.file(path)?.path_context();
        self.storage.last_modified(self.upload_id, path, &ctx)
    }

    /// URL-safe base64 MD5 of one live file.
    pub fn content_file_checksum(&self, path: &str) -> Result<String> {
        let bytes = self.read_file(path)?;
        let mut hasher = Md5::new();
        hasher.update(&bytes);
        Ok(URL_SAFE.encode(hasher.finalize()))
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Lock the workspace against mutation.
    pub fn lock(&mut self) -> Result<()> {
        self.lock_state = LockState::Locked;
        self.log.info("Locked workspace")?;
        Ok(())
    }

    /// Unlock the workspace.
    pub fn unlock(&mut self) -> Result<()> {
        self.lock_state = LockState::Unlocked;
        self.log.info("Unlocked workspace")?;
        Ok(())
    }

    /// Release the workspace (owner is done with it).
    pub fn release(&mut self) -> Result<()> {
        if self.status == Status::Deleted {
            return Err(Error::not_writable("deleted"));
        }
        self.status = Status::Released;
        self.log.info("Released workspace")?;
        Ok(())
    }

    /// Reverse a release.
    pub fn unrelease(&mut self) -> Result<()> {
        if self.status == Status::Deleted {
            return Err(Error::not_writable("deleted"));
        }
        self.status = Status::Active;
        self.log.info("Unreleased workspace")?;
        Ok(())
    }

    /// Destroy the workspace: retain the source log under the deleted-logs
    /// directory, delete the directory tree, and mark the workspace
    /// deleted. Terminal.
    pub fn destroy(&mut self) -> Result<()> {
        if self.status == Status::Deleted {
            return Err(Error::not_writable("deleted"));
        }
        self.log.info("Deleting workspace")?;
        let log_bytes = self.log.read()?;
        let base = self.paths().base().to_path_buf();
        let retained = WorkspacePaths::deleted_log_path(&base, self.upload_id);
        if let Some(parent) = retained.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&retained, log_bytes)?;

        self.storage.delete_workspace(self.upload_id)?;
        self.index = FileIndex::new();
        self.status = Status::Deleted;
        Ok(())
    }

    /// Snapshot of the workspace for the persistence and HTTP layers.
    pub fn to_record(&self) -> WorkspaceRecord {
        WorkspaceRecord {
            upload_id: self.upload_id,
            owner_user_id: self.owner_user_id.clone(),
            submission_id: self.submission_id.clone(),
            created_datetime: self.created_datetime,
            modified_datetime: self.modified_datetime,
            lastupload_start_datetime: self.lastupload_start_datetime,
            lastupload_completion_datetime: self.lastupload_completion_datetime,
            status: self.status,
            lock_state: self.lock_state,
            source_type: self.source_type,
            readiness: self.readiness(),
            total_size_bytes: self.total_size_bytes(),
            diagnostics: self.diagnostics.triples(),
            files: self
                .index
                .iter(IterOptions::client_view())
                .map(FileRecord::from)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sourcemill_storage::SimpleStorage;
    use tempfile::tempdir;

    fn workspace() -> (tempfile::TempDir, Workspace) {
        let dir = tempdir().unwrap();
        let storage: Arc<dyn StorageAdapter> = Arc::new(SimpleStorage::new(dir.path()));
        let ws = Workspace::create(storage, 77, "user-a").unwrap();
        (dir, ws)
    }

    #[test]
    fn test_create_lays_out_directories() {
        let (dir, ws) = workspace();
        assert!(dir.path().join("77/src").is_dir());
        assert!(dir.path().join("77/source.log").is_file());
        assert_eq!(ws.status(), Status::Active);
        assert_eq!(ws.source_type(), SourceType::Unknown);
        assert_eq!(ws.readiness(), Readiness::Ready);
    }

    #[test]
    fn test_open_missing_workspace() {
        let dir = tempdir().unwrap();
        let storage: Arc<dyn StorageAdapter> = Arc::new(SimpleStorage::new(dir.path()));
        let err = Workspace::open(storage, 5, "u").unwrap_err();
        assert_eq!(err.code(), "workspace_not_found");
    }

    #[test]
    fn test_create_file_and_read_back() {
        let (_dir, mut ws) = workspace();
        ws.create_file("main.tex", &CreateOptions::touch()).unwrap();
        ws.write_file("main.tex", b"\\documentclass{article}").unwrap();
        assert!(ws.exists("main.tex"));
        assert_eq!(ws.read_file("main.tex").unwrap(), b"\\documentclass{article}");
        assert_eq!(ws.file("main.tex").unwrap().size_bytes, 23);
    }

    #[test]
    fn test_create_file_registers_parent_directories() {
        let (_dir, mut ws) = workspace();
        ws.create_file("figs/deep/a.pdf", &CreateOptions::touch())
            .unwrap();
        assert!(ws.index().get("figs").unwrap().is_directory);
        assert!(ws.index().get("figs/deep").unwrap().is_directory);
    }

    #[test]
    fn test_create_file_refuses_traversal_and_records_fault() {
        let (_dir, mut ws) = workspace();
        let err = ws
            .create_file("../evil.tex", &CreateOptions::touch())
            .unwrap_err();
        assert!(err.is_storage_error());
        assert!(ws
            .diagnostics()
            .iter()
            .any(|d| d.code == "storage_failed" && d.severity == Severity::Fatal));
    }

    #[test]
    fn test_ancillary_inference_from_path() {
        let (_dir, mut ws) = workspace();
        ws.create_file("anc/data.csv", &CreateOptions::touch())
            .unwrap();
        assert!(ws.file("anc/data.csv").unwrap().is_ancillary);
    }

    #[test]
    fn test_modified_datetime_moves_with_mutations() {
        let (_dir, mut ws) = workspace();
        let before = ws.modified_datetime();
        std::thread::sleep(std::time::Duration::from_millis(5));
        ws.create_file("a.tex", &CreateOptions::touch()).unwrap();
        assert!(ws.modified_datetime() > before);
        assert!(ws.modified_datetime() >= ws.created_datetime());
    }

    #[test]
    fn test_remove_and_reason() {
        let (dir, mut ws) = workspace();
        ws.create_file("core", &CreateOptions::touch()).unwrap();
        ws.remove("core", "Removed file 'core' [File not allowed].")
            .unwrap();
        assert!(!ws.exists("core"));
        assert!(dir.path().join("77/removed/core").exists());
        let removed = ws.index().get_removed("core").unwrap();
        assert!(removed.is_removed);
    }

    #[test]
    fn test_rename_rekeys_diagnostics() {
        let (_dir, mut ws) = workspace();
        ws.create_file("-bad.tex", &CreateOptions::touch()).unwrap();
        ws.add_warning("-bad.tex", "filename_leading_hyphen", "renamed");
        let new_path = ws.rename("-bad.tex", "_bad.tex").unwrap();
        assert_eq!(new_path, "_bad.tex");
        assert!(ws
            .diagnostics()
            .get("filename_leading_hyphen", "_bad.tex")
            .is_some());
        assert!(ws.exists("_bad.tex"));
    }

    #[test]
    fn test_replace_promotes_repair_file() {
        let (_dir, mut ws) = workspace();
        ws.create_file("fig.ps", &CreateOptions::touch()).unwrap();
        ws.write_file("fig.ps", b"broken").unwrap();
        ws.create_file("fig.ps.fixed", &CreateOptions::touch()).unwrap();
        ws.write_file("fig.ps.fixed", b"%!\nrepaired").unwrap();
        ws.replace("fig.ps", "fig.ps.fixed").unwrap();
        assert!(!ws.exists("fig.ps.fixed"));
        assert_eq!(ws.read_file("fig.ps").unwrap(), b"%!\nrepaired");
        assert_eq!(ws.file("fig.ps").unwrap().size_bytes, 11);
    }

    #[test]
    fn test_delete_all_files_resets_state() {
        let (_dir, mut ws) = workspace();
        ws.create_file("a.tex", &CreateOptions::touch()).unwrap();
        ws.create_file("anc/b.dat", &CreateOptions::touch()).unwrap();
        ws.add_error("a.tex", "some_code", "bad");
        ws.set_source_type(SourceType::Tex);
        ws.delete_all_files().unwrap();
        assert_eq!(ws.index().all_file_count(), 0);
        assert!(ws.diagnostics().is_empty());
        assert_eq!(ws.source_type(), SourceType::Unknown);
        assert_eq!(ws.readiness(), Readiness::Ready);
    }

    #[test]
    fn test_locked_workspace_refuses_mutations() {
        let (_dir, mut ws) = workspace();
        ws.create_file("a.tex", &CreateOptions::touch()).unwrap();
        ws.lock().unwrap();

        let refused = [
            ws.create_file("b.tex", &CreateOptions::touch()).unwrap_err(),
            ws.remove("a.tex", "no").unwrap_err(),
            ws.delete("a.tex").unwrap_err(),
            ws.rename("a.tex", "b.tex").unwrap_err(),
            ws.perform_checks().unwrap_err(),
            ws.pack_content().unwrap_err(),
            ws.upload("c.tex", b"x", false).unwrap_err(),
            ws.delete_all_files().unwrap_err(),
        ];
        for err in refused {
            assert_eq!(err.code(), "workspace_not_writable");
        }

        // Read-only operations still succeed.
        assert!(ws.exists("a.tex"));
        assert_eq!(ws.status(), Status::Active);
        let _ = ws.readiness();

        ws.unlock().unwrap();
        ws.create_file("b.tex", &CreateOptions::touch()).unwrap();
    }

    #[test]
    fn test_released_workspace_refuses_mutations() {
        let (_dir, mut ws) = workspace();
        ws.release().unwrap();
        let err = ws.create_file("a.tex", &CreateOptions::touch()).unwrap_err();
        assert_eq!(err.code(), "workspace_not_writable");
        ws.unrelease().unwrap();
        ws.create_file("a.tex", &CreateOptions::touch()).unwrap();
    }

    #[test]
    fn test_locked_workspace_serves_built_package() {
        let (_dir, mut ws) = workspace();
        ws.create_file("main.tex", &CreateOptions::touch()).unwrap();
        ws.write_file("main.tex", b"content").unwrap();
        ws.pack_content().unwrap();
        let sum = ws.content_checksum().unwrap().unwrap();
        ws.lock().unwrap();
        assert!(ws.get_content().is_ok());
        assert_eq!(ws.content_checksum().unwrap().unwrap(), sum);
        assert!(ws.content_package_size().unwrap() > 0);
    }

    #[test]
    fn test_readiness_derivation() {
        let (_dir, mut ws) = workspace();
        ws.create_file("a.tex", &CreateOptions::touch()).unwrap();
        assert_eq!(ws.readiness(), Readiness::Ready);

        ws.add_warning("a.tex", "possible_backup_file", "check this");
        assert_eq!(ws.readiness(), Readiness::ReadyWithWarnings);

        ws.add_error("a.tex", "bbl_missing", "missing refs.bbl");
        assert_eq!(ws.readiness(), Readiness::Errors);

        // Resolving the fatal entry falls back to warnings.
        ws.resolve_diagnostic("bbl_missing", "a.tex");
        assert_eq!(ws.readiness(), Readiness::ReadyWithWarnings);
    }

    #[test]
    fn test_fatal_on_removed_file_stops_gating() {
        let (_dir, mut ws) = workspace();
        ws.create_file("refs.bib", &CreateOptions::touch()).unwrap();
        ws.add_error("refs.bib", "bbl_missing", "missing");
        assert_eq!(ws.readiness(), Readiness::Errors);
        ws.remove("refs.bib", "replaced by refs.bbl").unwrap();
        assert_eq!(ws.readiness(), Readiness::Ready);
    }

    #[test]
    fn test_destroy_retains_log() {
        let (dir, mut ws) = workspace();
        ws.create_file("a.tex", &CreateOptions::touch()).unwrap();
        ws.destroy().unwrap();
        assert_eq!(ws.status(), Status::Deleted);
        assert!(!dir.path().join("77").exists());
        let retained = dir
            .path()
            .join("deleted_workspace_logs/000000077_source.log");
        assert!(retained.exists());
        let text = std::fs::read_to_string(retained).unwrap();
        assert!(text.contains("Created workspace 77"));
        assert!(text.contains("Deleting workspace"));

        // Terminal: everything now refuses.
        assert!(ws.destroy().is_err());
        assert!(ws.release().is_err());
        assert_eq!(
            ws.create_file("b.tex", &CreateOptions::touch())
                .unwrap_err()
                .code(),
            "workspace_not_writable"
        );
    }

    #[test]
    fn test_upload_runs_pipeline_and_stamps_times() {
        let (_dir, mut ws) = workspace();
        assert!(ws.lastupload_start_datetime().is_none());
        ws.upload("main.tex", b"hello", false).unwrap();
        assert!(ws.lastupload_start_datetime().is_some());
        assert!(ws.lastupload_completion_datetime().is_some());
        assert!(ws.exists("main.tex"));
        assert_eq!(ws.total_size_bytes(), 5);
    }

    #[test]
    fn test_upload_strips_client_directories() {
        let (_dir, mut ws) = workspace();
        ws.upload("nested/dir/main.tex", b"x", false).unwrap();
        assert!(ws.exists("main.tex"));
        assert!(!ws.exists("nested/dir/main.tex"));
    }

    #[test]
    fn test_ancillary_upload_prefixes_anc() {
        let (_dir, mut ws) = workspace();
        ws.upload("extra.dat", b"x", true).unwrap();
        assert!(ws.exists("anc/extra.dat"));
        assert!(ws.file("anc/extra.dat").unwrap().is_ancillary);
    }

    #[test]
    fn test_content_file_accessors() {
        let (_dir, mut ws) = workspace();
        ws.create_file("main.tex", &CreateOptions::touch()).unwrap();
        ws.write_file("main.tex", b"hello").unwrap();
        assert_eq!(ws.content_file_size("main.tex").unwrap(), 5);
        let sum = ws.content_file_checksum("main.tex").unwrap();
        assert_eq!(sum.len(), 24);
        assert!(ws.content_file_last_modified("main.tex").is_ok());
        assert!(ws.content_file_size("missing.tex").is_err());
    }

    #[test]
    fn test_record_snapshot() {
        let (_dir, mut ws) = workspace();
        ws.create_file("main.tex", &CreateOptions::touch()).unwrap();
        ws.add_warning("main.tex", "w", "note");
        ws.set_submission_id("sub-123");
        let record = ws.to_record();
        assert_eq!(record.upload_id, 77);
        assert_eq!(record.submission_id.as_deref(), Some("sub-123"));
        assert_eq!(record.readiness, Readiness::ReadyWithWarnings);
        assert_eq!(record.files.len(), 1);
        assert_eq!(record.diagnostics.len(), 1);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"ready_with_warnings\""));
    }

    #[test]
    fn test_refresh_index_from_disk() {
        let (dir, mut ws) = workspace();
        std::fs::create_dir_all(dir.path().join("77/src/figs")).unwrap();
        std::fs::write(dir.path().join("77/src/main.tex"), b"x").unwrap();
        std::fs::write(dir.path().join("77/src/figs/a.pdf"), b"y").unwrap();
        std::fs::create_dir_all(dir.path().join("77/src/anc")).unwrap();
        std::fs::write(dir.path().join("77/src/anc/d.csv"), b"z").unwrap();
        ws.refresh_index_from_disk().unwrap();
        assert!(ws.exists("main.tex"));
        assert!(ws.exists("figs/a.pdf"));
        assert!(ws.file("anc/d.csv").unwrap().is_ancillary);
        assert!(ws.index().get("figs").unwrap().is_directory);
        assert_eq!(ws.index().file_count(), 2);
    }

    #[test]
    fn test_set_file_type_epoch_converges() {
        let (_dir, mut ws) = workspace();
        ws.create_file("a.bin", &CreateOptions::touch()).unwrap();
        let e0 = ws.epoch();
        ws.set_file_type("a.bin", FileType::Pdf).unwrap();
        assert_eq!(ws.epoch(), e0 + 1);
        ws.set_file_type("a.bin", FileType::Pdf).unwrap();
        assert_eq!(ws.epoch(), e0 + 1);
    }
}
