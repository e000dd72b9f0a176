//! Workspace service: wiring, lifecycle, and per-id serialization
//!
//! Each workspace is a single-writer unit. The hosting layer must hold
//! the workspace's mutex for the duration of any mutating request; two
//! concurrent mutations against the same upload id are never permitted.
//! [`WorkspaceLocks`] provides that mutex map, and [`WorkspaceService`]
//! applies it around its own mutating entry points.

use dashmap::DashMap;
use parking_lot::Mutex;
use sourcemill_checks::default_checkers;
use sourcemill_core::Result;
use sourcemill_storage::{QuarantineStorage, SimpleStorage, StorageAdapter};
use sourcemill_workspace::Workspace;
use std::sync::Arc;
use tracing::info;

use crate::config::SourcemillConfig;

/// Code for uploads that exceed the configured budget.
pub const UPLOAD_SIZE_EXCEEDED: &str = "upload_size_exceeded";

/// Per-upload-id mutex map.
///
/// Cloning the returned `Arc` and locking it serializes every mutating
/// operation for that workspace; read-only requests may proceed without
/// it.
#[derive(Debug, Default)]
pub struct WorkspaceLocks {
    inner: DashMap<u64, Arc<Mutex<()>>>,
}

impl WorkspaceLocks {
    /// Create an empty lock map.
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding `upload_id`, created on first use.
    pub fn for_workspace(&self, upload_id: u64) -> Arc<Mutex<()>> {
        self.inner
            .entry(upload_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the mutex entry for a destroyed workspace.
    pub fn forget(&self, upload_id: u64) {
        self.inner.remove(&upload_id);
    }
}

/// Creates, opens, and destroys workspaces against the configured
/// storage backend, with the canonical checker list attached.
#[derive(Debug)]
pub struct WorkspaceService {
    config: SourcemillConfig,
    storage: Arc<dyn StorageAdapter>,
    locks: WorkspaceLocks,
}

impl WorkspaceService {
    /// Build a service from configuration. A configured quarantine root
    /// selects the quarantine backend.
    pub fn new(config: SourcemillConfig) -> Self {
        let storage: Arc<dyn StorageAdapter> = match &config.quarantine_dir {
            Some(quarantine) => {
                Arc::new(QuarantineStorage::new(quarantine.clone(), config.base_dir.clone()))
            }
            None => Arc::new(SimpleStorage::new(config.base_dir.clone())),
        };
        WorkspaceService {
            config,
            storage,
            locks: WorkspaceLocks::new(),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &SourcemillConfig {
        &self.config
    }

    /// The storage backend shared by all workspaces.
    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    /// The per-workspace mutex map for the hosting layer.
    pub fn locks(&self) -> &WorkspaceLocks {
        &self.locks
    }

    /// Create a fresh workspace with the canonical checker list.
    pub fn create_workspace(
        &self,
        upload_id: u64,
        owner_user_id: impl Into<String>,
    ) -> Result<Workspace> {
        let lock = self.locks.for_workspace(upload_id);
        let _guard = lock.lock();
        let workspace = Workspace::create(self.storage.clone(), upload_id, owner_user_id)?
            .with_checkers(default_checkers());
        info!(upload_id, "created workspace");
        Ok(workspace)
    }

    /// Open an existing workspace, rebuilding its index from disk.
    pub fn open_workspace(
        &self,
        upload_id: u64,
        owner_user_id: impl Into<String>,
    ) -> Result<Workspace> {
        let workspace = Workspace::open(self.storage.clone(), upload_id, owner_user_id)?
            .with_checkers(default_checkers());
        Ok(workspace)
    }

    /// Deposit a payload and run the check pipeline, holding the
    /// workspace's mutex for the duration.
    ///
    /// An upload that would blow the configured budget is refused with a
    /// fatal `upload_size_exceeded` diagnostic; nothing is deposited.
    pub fn upload(
        &self,
        workspace: &mut Workspace,
        name: &str,
        payload: &[u8],
        ancillary: bool,
    ) -> Result<()> {
        let lock = self.locks.for_workspace(workspace.upload_id());
        let _guard = lock.lock();

        let projected = workspace.total_size_bytes() + payload.len() as u64;
        if projected > self.config.max_upload_size_bytes {
            workspace.add_non_file_error(
                UPLOAD_SIZE_EXCEEDED,
                format!(
                    "Upload of '{}' ({} bytes) would exceed the {} byte limit for this workspace.",
                    name,
                    payload.len(),
                    self.config.max_upload_size_bytes
                ),
            );
            return Ok(());
        }
        // A prior over-budget refusal is resolved by a deposit that fits.
        workspace.resolve_diagnostic(UPLOAD_SIZE_EXCEEDED, "");
        workspace.upload(name, payload, ancillary)
    }

    /// Destroy a workspace and drop its lock entry.
    pub fn destroy_workspace(&self, workspace: &mut Workspace) -> Result<()> {
        let upload_id = workspace.upload_id();
        let lock = self.locks.for_workspace(upload_id);
        {
            let _guard = lock.lock();
            workspace.destroy()?;
        }
        self.locks.forget(upload_id);
        info!(upload_id, "destroyed workspace");
        Ok(())
    }
}
