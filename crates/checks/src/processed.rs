//! Check for a leftover 'processed' directory
//!
//! A 'processed' directory usually means files were imported from a prior
//! version of the paper. Legacy behavior deleted it when replacing a
//! submission; here it only draws a warning for the submitter to resolve.

use sourcemill_core::Result;
use sourcemill_workspace::{Checker, Workspace};

/// Code for a detected processed directory.
pub const PROCESSED_DIRECTORY: &str = "processed_directory";
const PROCESSED_DIRECTORY_MESSAGE: &str = "Detected 'processed' directory. Please check.";

/// Check for and warn about a 'processed' directory.
#[derive(Debug, Default)]
pub struct WarnAboutProcessedDirectory;

impl Checker for WarnAboutProcessedDirectory {
    fn name(&self) -> &'static str {
        "WarnAboutProcessedDirectory"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        let file = workspace.file(path)?;
        if file.is_directory && file.name() == "processed" {
            workspace.add_warning(path, PROCESSED_DIRECTORY, PROCESSED_DIRECTORY_MESSAGE);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{put, workspace};
    use sourcemill_workspace::CreateOptions;

    #[test]
    fn test_processed_directory_warns_but_stays() {
        let (_dir, mut ws) = workspace();
        ws.create_file(
            "processed",
            &CreateOptions {
                is_directory: true,
                ..Default::default()
            },
        )
        .unwrap();
        WarnAboutProcessedDirectory
            .check(&mut ws, "processed")
            .unwrap();
        assert!(ws.exists("processed"));
        assert!(ws
            .diagnostics()
            .get(PROCESSED_DIRECTORY, "processed")
            .is_some());
    }

    #[test]
    fn test_regular_file_named_processed_is_fine() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "processed", b"data");
        WarnAboutProcessedDirectory
            .check(&mut ws, "processed")
            .unwrap();
        assert!(ws.diagnostics().is_empty());
    }
}
