//! Checks related to well-formedness of TeX sources

use sourcemill_core::{FileType, Result};
use sourcemill_workspace::{Checker, Workspace};

/// Records LaTeX sources in the workspace log for the form check.
///
/// The document-style analysis itself happens downstream; the log entry
/// gives administrators the trail they need when a submission is held.
#[derive(Debug, Default)]
pub struct CheckTeXForm;

impl Checker for CheckTeXForm {
    fn name(&self) -> &'static str {
        "CheckTeXForm"
    }

    fn check_typed(
        &self,
        workspace: &mut Workspace,
        path: &str,
        file_type: FileType,
    ) -> Result<()> {
        if matches!(file_type, FileType::Latex | FileType::Latex2e) {
            workspace.log_info(&format!("Checked form of TeX file '{}'.", path));
        }
        Ok(())
    }
}
