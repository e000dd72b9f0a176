//! Check pipeline framework
//!
//! A checker is a unit with up to four entry points: a generic per-file
//! `check`, a `check_typed` hook invoked with the file's current type, a
//! `check_finally` tail hook, and a once-per-pass `check_workspace`.
//! Checkers must be idempotent under repeated invocation when nothing
//! changed; the strategy relies on that to converge.
//!
//! The strategy applies the configured checkers in list order: for each
//! checker, every live file is visited (generic, typed, final hooks in
//! that order), then the checker's workspace hook runs. Whole passes
//! repeat until a pass leaves the workspace mutation epoch untouched.
//! Checker faults are captured as diagnostics; only storage faults
//! propagate.

use sourcemill_core::{Diagnostic, Error, FileType, Result};
use tracing::debug;

use crate::workspace::Workspace;

/// One unit of the check pipeline.
///
/// All hooks default to no-ops; implementations override the ones they
/// need. Hooks receive the file by path and go back through the workspace
/// for every read and mutation, so the index and storage cannot drift.
pub trait Checker: Send + Sync + std::fmt::Debug {
    /// Name used in logs and fault diagnostics.
    fn name(&self) -> &'static str;

    /// Generic hook, invoked for every file.
    fn check(&self, _workspace: &mut Workspace, _path: &str) -> Result<()> {
        Ok(())
    }

    /// Typed hook, invoked with the file's current type after `check`.
    fn check_typed(
        &self,
        _workspace: &mut Workspace,
        _path: &str,
        _file_type: FileType,
    ) -> Result<()> {
        Ok(())
    }

    /// Tail hook, invoked after the generic and typed hooks.
    fn check_finally(&self, _workspace: &mut Workspace, _path: &str) -> Result<()> {
        Ok(())
    }

    /// Workspace-level hook, invoked once per pass after this checker's
    /// file loop.
    fn check_workspace(&self, _workspace: &mut Workspace) -> Result<()> {
        Ok(())
    }
}

/// How `perform_checks` drives the checker list.
pub trait CheckingStrategy: Send + Sync + std::fmt::Debug {
    /// Run the checkers over the workspace until quiescent.
    fn check(&self, workspace: &mut Workspace, checkers: &[Box<dyn Checker>]) -> Result<()>;
}

/// Single-threaded strategy: checkers in order, files in index order,
/// whole passes until a pass causes no mutation.
#[derive(Debug, Clone)]
pub struct SynchronousCheckingStrategy {
    max_passes: usize,
}

/// Pass bound before the pipeline is declared stuck.
const DEFAULT_MAX_PASSES: usize = 25;

impl Default for SynchronousCheckingStrategy {
    fn default() -> Self {
        SynchronousCheckingStrategy {
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl SynchronousCheckingStrategy {
    /// Strategy with the default pass bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Strategy with a custom pass bound (tests).
    pub fn with_max_passes(max_passes: usize) -> Self {
        SynchronousCheckingStrategy { max_passes }
    }

    /// Capture a non-storage checker fault as a fatal diagnostic.
    fn capture(
        workspace: &mut Workspace,
        checker: &dyn Checker,
        path: &str,
        result: Result<()>,
    ) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_storage_error() => Err(e),
            Err(e) => {
                workspace.add_diagnostic(Diagnostic::fatal(
                    "checker_failed",
                    path,
                    format!("{}: {}", checker.name(), e),
                ));
                Ok(())
            }
        }
    }
}

impl CheckingStrategy for SynchronousCheckingStrategy {
    fn check(&self, workspace: &mut Workspace, checkers: &[Box<dyn Checker>]) -> Result<()> {
        for pass in 1..=self.max_passes {
            let epoch_before = workspace.epoch();
            debug!(
                upload_id = workspace.upload_id(),
                pass, "starting check pass"
            );

            for checker in checkers {
                for path in workspace.live_check_paths() {
                    // The file may have been renamed or removed by an
                    // earlier checker in this pass.
                    if !workspace.exists(&path) {
                        continue;
                    }
                    let result = checker.check(workspace, &path);
                    Self::capture(workspace, checker.as_ref(), &path, result)?;

                    let current_type = match workspace.file(&path) {
                        Ok(file) => file.file_type,
                        Err(_) => continue,
                    };
                    let result = checker.check_typed(workspace, &path, current_type);
                    Self::capture(workspace, checker.as_ref(), &path, result)?;

                    if workspace.exists(&path) {
                        let result = checker.check_finally(workspace, &path);
                        Self::capture(workspace, checker.as_ref(), &path, result)?;
                    }
                }
                let result = checker.check_workspace(workspace);
                Self::capture(workspace, checker.as_ref(), "", result)?;
            }

            workspace.mark_all_checked();
            if workspace.epoch() == epoch_before {
                debug!(
                    upload_id = workspace.upload_id(),
                    pass, "check passes converged"
                );
                return Ok(());
            }
        }
        Err(Error::ChecksNotConverging {
            passes: self.max_passes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::CreateOptions;
    use sourcemill_storage::{SimpleStorage, StorageAdapter};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn workspace_with(checkers: Vec<Box<dyn Checker>>) -> (tempfile::TempDir, Workspace) {
        let dir = tempdir().unwrap();
        let storage: Arc<dyn StorageAdapter> = Arc::new(SimpleStorage::new(dir.path()));
        let ws = Workspace::create(storage, 1, "user1")
            .unwrap()
            .with_checkers(checkers);
        (dir, ws)
    }

    #[derive(Debug)]
    struct CountingChecker;

    impl Checker for CountingChecker {
        fn name(&self) -> &'static str {
            "CountingChecker"
        }

        fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
            let seen = workspace
                .diagnostics()
                .get("seen", path)
                .map(|d| d.message.parse::<u32>().unwrap_or(0))
                .unwrap_or(0);
            workspace.add_diagnostic(
                Diagnostic::info("seen", path, format!("{}", seen + 1)).persistent(true),
            );
            Ok(())
        }
    }

    #[derive(Debug)]
    struct RemoveEverythingOnce;

    impl Checker for RemoveEverythingOnce {
        fn name(&self) -> &'static str {
            "RemoveEverythingOnce"
        }

        fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
            workspace.remove(path, "cleared")?;
            Ok(())
        }
    }

    #[derive(Debug)]
    struct FaultyChecker;

    impl Checker for FaultyChecker {
        fn name(&self) -> &'static str {
            "FaultyChecker"
        }

        fn check(&self, _workspace: &mut Workspace, _path: &str) -> Result<()> {
            Err(Error::internal("deliberate fault"))
        }
    }

    #[test]
    fn test_converges_on_quiescent_workspace() {
        let (_dir, mut ws) = workspace_with(vec![Box::new(CountingChecker)]);
        ws.create_file("a.tex", &CreateOptions::touch()).unwrap();
        ws.perform_checks().unwrap();
        // A quiescent file is visited once per pass; a clean first pass
        // means exactly one visit.
        assert_eq!(ws.diagnostics().get("seen", "a.tex").unwrap().message, "1");
    }

    #[test]
    fn test_mutating_pass_triggers_another() {
        let (_dir, mut ws) = workspace_with(vec![Box::new(RemoveEverythingOnce)]);
        ws.create_file("a.tex", &CreateOptions::touch()).unwrap();
        ws.perform_checks().unwrap();
        assert!(!ws.exists("a.tex"));
        assert_eq!(ws.index().file_count(), 0);
    }

    #[test]
    fn test_checker_fault_becomes_diagnostic() {
        let (_dir, mut ws) = workspace_with(vec![Box::new(FaultyChecker)]);
        ws.create_file("a.tex", &CreateOptions::touch()).unwrap();
        ws.perform_checks().unwrap();
        let d = ws.diagnostics().get("checker_failed", "a.tex").unwrap();
        assert!(d.message.contains("FaultyChecker"));
        assert!(d.message.contains("deliberate fault"));
    }

    #[test]
    fn test_nonconverging_pipeline_is_bounded() {
        #[derive(Debug)]
        struct Churner;
        impl Checker for Churner {
            fn name(&self) -> &'static str {
                "Churner"
            }
            fn check_workspace(&self, workspace: &mut Workspace) -> Result<()> {
                // Creates a fresh file every pass, so the epoch always moves.
                let path = format!("churn-{}.txt", workspace.epoch());
                workspace.create_file(&path, &CreateOptions::touch())?;
                Ok(())
            }
        }

        let dir = tempdir().unwrap();
        let storage: Arc<dyn StorageAdapter> = Arc::new(SimpleStorage::new(dir.path()));
        let mut ws = Workspace::create(storage, 1, "user1")
            .unwrap()
            .with_checkers(vec![Box::new(Churner)])
            .with_strategy(Box::new(SynchronousCheckingStrategy::with_max_passes(3)));
        let err = ws.perform_checks().unwrap_err();
        assert_eq!(err.code(), "checks_not_converging");
    }

    #[test]
    fn test_typed_hook_sees_current_type() {
        #[derive(Debug)]
        struct Typer;
        impl Checker for Typer {
            fn name(&self) -> &'static str {
                "Typer"
            }
            fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
                workspace.set_file_type(path, FileType::Pdf)?;
                Ok(())
            }
            fn check_typed(
                &self,
                workspace: &mut Workspace,
                path: &str,
                file_type: FileType,
            ) -> Result<()> {
                // The generic hook ran first in the same visit.
                assert_eq!(file_type, FileType::Pdf);
                workspace.add_diagnostic(
                    Diagnostic::info("typed_saw", path, file_type.as_str()).persistent(true),
                );
                Ok(())
            }
        }

        let (_dir, mut ws) = workspace_with(vec![Box::new(Typer)]);
        ws.create_file("doc.bin", &CreateOptions::touch()).unwrap();
        ws.perform_checks().unwrap();
        assert_eq!(
            ws.diagnostics().get("typed_saw", "doc.bin").unwrap().message,
            "pdf"
        );
    }
}
