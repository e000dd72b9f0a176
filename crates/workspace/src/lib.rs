//! Workspace domain for sourcemill
//!
//! This crate binds the storage layer into the upload workspace aggregate:
//! - [`UserFile`]: one file (or directory) known to a workspace
//! - [`FileIndex`]: insertion-ordered index partitioned into source /
//!   ancillary / removed / system views
//! - [`SourceLog`]: the append-only per-workspace event log
//! - [`SourcePackage`]: the derived gzipped tar of the source area
//! - [`Checker`] / [`CheckingStrategy`]: the check pipeline contract
//! - [`Workspace`]: the aggregate with its lifecycle state machine
//!
//! The aggregate is single-writer and strictly blocking. Checkers are the
//! only things that mutate files once they are deposited; every mutation
//! goes through [`Workspace`] so that the index and the filesystem can
//! never disagree.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checker;
pub mod file;
pub mod index;
pub mod log;
pub mod package;
pub mod record;
pub mod workspace;

pub use checker::{Checker, CheckingStrategy, SynchronousCheckingStrategy};
pub use file::{CreateOptions, UserFile};
pub use index::{FileIndex, IterOptions, TypeCounts};
pub use log::SourceLog;
pub use package::SourcePackage;
pub use record::{FileRecord, WorkspaceRecord};
pub use workspace::Workspace;
