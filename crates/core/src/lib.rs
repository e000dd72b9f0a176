//! Core types for sourcemill
//!
//! This crate defines the foundational types used throughout the system:
//! - FileType: Semantic type of a single uploaded file
//! - SourceType: Aggregate classification of a workspace
//! - Status / LockState / Readiness: Workspace lifecycle states
//! - Severity / Diagnostic / DiagnosticList: Structured check outcomes
//! - Error: Unified error type hierarchy
//! - Relative-path helpers shared by storage and the file index

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diagnostic;
pub mod error;
pub mod path;
pub mod types;

pub use diagnostic::{Diagnostic, DiagnosticList, Severity};
pub use error::{Error, Result};
pub use types::{FileType, LockState, Readiness, SourceType, Status};
