//! Storage layer for sourcemill
//!
//! This crate implements file I/O for upload workspaces behind the
//! [`StorageAdapter`] trait:
//! - `SimpleStorage`: a single base directory, `<base>/<upload_id>/{src,removed}`
//! - `QuarantineStorage`: writes land in a quarantine root until explicitly
//!   persisted into the permanent root
//!
//! The critical contract is [`StorageAdapter::is_safe`]: every resolved path
//! must stay under its area root. Callers consult it before creating,
//! writing, extracting, or renaming; the adapters refuse to resolve a path
//! that escapes.
//!
//! All I/O is blocking. Any filesystem failure surfaces as a typed storage
//! error and aborts the calling operation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
mod fsops;
pub mod paths;
pub mod quarantine;
pub mod simple;

pub use adapter::{PathContext, StorageAdapter};
pub use paths::{Area, WorkspacePaths, ANCILLARY_PREFIX, REMOVED_PREFIX, SOURCE_LOG_NAME, SOURCE_PREFIX};
pub use quarantine::QuarantineStorage;
pub use simple::SimpleStorage;
