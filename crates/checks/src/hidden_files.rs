//! Checks for and removes hidden files

use sourcemill_core::Result;
use sourcemill_workspace::{Checker, Workspace};

/// Code for macOS metadata directories.
pub const HIDDEN_FILES: &str = "hidden_files";
const HIDDEN_FILES_MACOSX_MESSAGE: &str = "Removed '__MACOSX' directory.";

/// Code for dot-prefixed files.
pub const HIDDEN_FILES_DOT: &str = "hidden_files_dot";
const HIDDEN_FILES_MESSAGE: &str = "Hidden file are not allowed.";

/// Removes `__MACOSX` directories.
#[derive(Debug, Default)]
pub struct RemoveMacOSXHiddenFiles;

impl Checker for RemoveMacOSXHiddenFiles {
    fn name(&self) -> &'static str {
        "RemoveMacOSXHiddenFiles"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        let file = workspace.file(path)?;
        if file.is_directory && file.name() == "__MACOSX" {
            workspace.add_warning_non_persistent(path, HIDDEN_FILES, HIDDEN_FILES_MACOSX_MESSAGE);
            workspace.remove(path, HIDDEN_FILES_MACOSX_MESSAGE)?;
        }
        Ok(())
    }
}

/// Removes files and directories that start with a dot.
#[derive(Debug, Default)]
pub struct RemoveFilesWithLeadingDot;

impl Checker for RemoveFilesWithLeadingDot {
    fn name(&self) -> &'static str {
        "RemoveFilesWithLeadingDot"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        let file = workspace.file(path)?;
        if file.name().starts_with('.') || file.path.starts_with('.') {
            let reason = format!("Removed file '{}' [File not allowed].", file.name());
            workspace.add_warning_non_persistent(path, HIDDEN_FILES_DOT, HIDDEN_FILES_MESSAGE);
            workspace.remove(path, &reason)?;
        }
        Ok(())
    }
}
