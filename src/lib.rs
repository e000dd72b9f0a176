//! # sourcemill
//!
//! Ingestion, sanitization, classification, and packaging of scholarly
//! submission source packages.
//!
//! Authors progressively upload files and archives into an isolated
//! per-submission **workspace**. Every file that enters is typed from its
//! name and content, run through an ordered pipeline of content checks
//! that may rename, remove, repair, or flag it, and folded into an
//! aggregate source classification. On demand, the workspace produces a
//! reproducible, checksummed gzipped tar of its source contents.
//!
//! # Quick Start
//!
//! ```no_run
//! use sourcemill::{SourcemillConfig, WorkspaceService};
//!
//! fn main() -> sourcemill::Result<()> {
//!     let config = SourcemillConfig::load_or_create("./sourcemill.toml")?;
//!     let service = WorkspaceService::new(config);
//!
//!     let mut workspace = service.create_workspace(4007, "user-42")?;
//!     service.upload(&mut workspace, "submission.tar.gz", &std::fs::read("submission.tar.gz")?, false)?;
//!
//!     println!("source type: {}", workspace.source_type());
//!     println!("readiness:   {}", workspace.readiness());
//!     for (severity, path, message) in workspace.diagnostics().triples() {
//!         println!("[{severity}] {path}: {message}");
//!     }
//!
//!     let checksum = workspace.content_checksum()?;
//!     println!("package checksum: {checksum:?}");
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! | Crate | Responsibility |
//! |-------|----------------|
//! | `sourcemill-core` | enums, diagnostics, unified error type, path helpers |
//! | `sourcemill-storage` | storage adapters with the safe-path guarantee |
//! | `sourcemill-workspace` | file index, source log, source package, workspace aggregate |
//! | `sourcemill-checks` | type inference, the checker library, archive unpacking |
//!
//! The [`WorkspaceService`] in this crate wires a storage backend and the
//! canonical checker list into workspaces, and provides the per-id
//! serialization the hosting layer must hold around mutating requests.
//! HTTP routing, authentication, and metadata persistence live outside
//! this repository; they consume [`WorkspaceRecord`] snapshots.

pub mod config;
pub mod service;

pub use config::{ConfigError, SourcemillConfig};
pub use service::{WorkspaceLocks, WorkspaceService};

pub use sourcemill_checks::default_checkers;
pub use sourcemill_core::{
    Diagnostic, DiagnosticList, Error, FileType, LockState, Readiness, Result, Severity,
    SourceType, Status,
};
pub use sourcemill_storage::{
    Area, PathContext, QuarantineStorage, SimpleStorage, StorageAdapter, WorkspacePaths,
};
pub use sourcemill_workspace::{
    Checker, CheckingStrategy, CreateOptions, FileIndex, FileRecord, IterOptions, SourceLog,
    SourcePackage, SynchronousCheckingStrategy, TypeCounts, UserFile, Workspace, WorkspaceRecord,
};
