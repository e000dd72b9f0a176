//! Check library for sourcemill
//!
//! This crate carries the content rules applied to every uploaded file:
//! - [`infer`]: the file-type inference algorithm (name patterns, magic
//!   bytes, deep line inspection)
//! - one module per checker family (hidden files, file names, errata,
//!   cleanup, unpacking, ...)
//! - [`default_checkers`]: the canonical ordered checker list applied by
//!   `perform_checks`
//!
//! Checkers implement the `Checker` trait from `sourcemill-workspace` and
//! mutate files only through the workspace API.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ancillary;
pub mod cleanup;
pub mod errata;
pub mod file_extensions;
pub mod file_names;
pub mod file_type;
pub mod hidden_files;
pub mod images;
pub mod infer;
pub mod invalid_types;
mod list;
pub mod processed;
pub mod source_types;
pub mod tex_format;
pub mod tex_generated;
pub mod unmacify;
pub mod unpack;
pub mod uuencoded;
pub mod zero_length;

pub use list::default_checkers;
