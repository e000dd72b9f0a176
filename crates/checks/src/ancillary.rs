//! Check for and mark ancillary files

use sourcemill_core::Result;
use sourcemill_workspace::{Checker, Workspace};

/// Marks files under the ancillary prefix as ancillary.
#[derive(Debug, Default)]
pub struct AncillaryFileChecker;

impl Checker for AncillaryFileChecker {
    fn name(&self) -> &'static str {
        "AncillaryFileChecker"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        let file = workspace.file(path)?;
        if !file.is_ancillary && (path == "anc" || path.starts_with("anc/")) {
            workspace.mark_ancillary(path)?;
        }
        Ok(())
    }
}
