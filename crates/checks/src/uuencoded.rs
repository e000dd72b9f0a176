//! Checks related to uuencoded files

use sourcemill_core::{FileType, Result};
use sourcemill_workspace::{Checker, Workspace};

/// Notes uuencoded files in the workspace log.
///
/// Decoding is not performed; uuencoded submissions have all but
/// disappeared, and the file will be refused by classification anyway.
#[derive(Debug, Default)]
pub struct CheckForUUEncodedFiles;

impl Checker for CheckForUUEncodedFiles {
    fn name(&self) -> &'static str {
        "CheckForUUEncodedFiles"
    }

    fn check_typed(
        &self,
        workspace: &mut Workspace,
        path: &str,
        file_type: FileType,
    ) -> Result<()> {
        if file_type == FileType::Uuencoded {
            workspace.log_info(&format!(
                "Found uuencoded file '{}'. Decoding is not performed.",
                path
            ));
        }
        Ok(())
    }
}
