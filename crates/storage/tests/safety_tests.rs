//! Containment tests for the storage backends.
//!
//! Every path the adapters resolve must stay under its area root. These
//! tests hammer that contract with hostile inputs on both backends.

use proptest::prelude::*;
use sourcemill_storage::{PathContext, QuarantineStorage, SimpleStorage, StorageAdapter};
use tempfile::tempdir;

const HOSTILE: &[&str] = &[
    "../../etc/passwd",
    "..",
    "../",
    "a/../../b",
    "a/b/../../../c",
    "/etc/passwd",
    "/..",
    "anc/../../x",
    "./../x",
    "....//....//x",
];

#[test]
fn simple_storage_refuses_hostile_paths() {
    let dir = tempdir().unwrap();
    let s = SimpleStorage::new(dir.path());
    for rel in HOSTILE {
        for ctx in [
            PathContext::source(),
            PathContext::ancillary(),
            PathContext::removed(),
            PathContext::system(),
        ] {
            if s.is_safe(1, rel, &ctx) {
                // "....//....//x" normalizes to odd-but-contained
                // components; only genuine escapes must be refused.
                let p = s.full_path(1, rel, &ctx).unwrap();
                assert!(p.starts_with(dir.path()), "escaped: {rel} -> {p:?}");
            } else {
                assert!(s.full_path(1, rel, &ctx).is_err());
            }
        }
    }
}

#[test]
fn quarantine_storage_refuses_hostile_paths() {
    let q = tempdir().unwrap();
    let p = tempdir().unwrap();
    let s = QuarantineStorage::new(q.path(), p.path());
    for rel in HOSTILE {
        for persisted in [false, true] {
            let ctx = PathContext {
                is_persisted: persisted,
                ..PathContext::source()
            };
            if let Ok(full) = s.full_path(1, rel, &ctx) {
                let root = if persisted { p.path() } else { q.path() };
                assert!(full.starts_with(root), "escaped: {rel} -> {full:?}");
            }
        }
    }
}

#[test]
fn resolved_paths_always_stay_under_workspace() {
    let dir = tempdir().unwrap();
    let s = SimpleStorage::new(dir.path());
    let ws_root = dir.path().join("9");
    for rel in ["a.tex", "figs/b.pdf", "anc/extra.dat", "a/./b", "a//b"] {
        let p = s.full_path(9, rel, &PathContext::source()).unwrap();
        assert!(p.starts_with(&ws_root));
    }
}

proptest! {
    #[test]
    fn prop_no_resolution_escapes_the_base(rel in "[a-z./]{0,48}") {
        let dir = tempdir().unwrap();
        let s = SimpleStorage::new(dir.path());
        for ctx in [PathContext::source(), PathContext::removed(), PathContext::system()] {
            if let Ok(p) = s.full_path(5, &rel, &ctx) {
                prop_assert!(p.starts_with(dir.path()));
            }
        }
    }

    #[test]
    fn prop_safe_paths_resolve_and_unsafe_paths_error(rel in "(\\.\\./)*[a-z]{1,8}(/[a-z]{1,8}){0,3}") {
        let dir = tempdir().unwrap();
        let s = SimpleStorage::new(dir.path());
        let ctx = PathContext::source();
        let safe = s.is_safe(5, &rel, &ctx);
        prop_assert_eq!(safe, s.full_path(5, &rel, &ctx).is_ok());
        if rel.starts_with("../") {
            prop_assert!(!safe);
        }
    }
}
