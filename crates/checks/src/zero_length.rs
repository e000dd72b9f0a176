//! Check for and remove zero-length files

use sourcemill_core::Result;
use sourcemill_workspace::{Checker, Workspace};

/// Code for empty files.
pub const ZERO_LENGTH: &str = "zero_length";

/// Checks for and removes zero-length files.
#[derive(Debug, Default)]
pub struct ZeroLengthFileChecker;

impl Checker for ZeroLengthFileChecker {
    fn name(&self) -> &'static str {
        "ZeroLengthFileChecker"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        let file = workspace.file(path)?;
        if file.is_empty() && !file.is_directory {
            let message = format!("Removed file '{}' [file is empty].", file.name());
            workspace.add_info(path, ZERO_LENGTH, &message);
            workspace.remove(path, &message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{put, workspace};
    use sourcemill_core::Readiness;
    use sourcemill_workspace::CreateOptions;

    #[test]
    fn test_empty_file_removed_with_info() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "empty.dat", b"");
        ZeroLengthFileChecker.check(&mut ws, "empty.dat").unwrap();
        assert!(!ws.exists("empty.dat"));
        let d = ws.diagnostics().get(ZERO_LENGTH, "empty.dat").unwrap();
        assert!(d.message.contains("file is empty"));
        // An informational removal never degrades readiness.
        assert_eq!(ws.readiness(), Readiness::Ready);
    }

    #[test]
    fn test_nonempty_file_kept() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "main.tex", b"x");
        ZeroLengthFileChecker.check(&mut ws, "main.tex").unwrap();
        assert!(ws.exists("main.tex"));
    }

    #[test]
    fn test_directories_are_exempt() {
        let (_dir, mut ws) = workspace();
        ws.create_file(
            "figs",
            &CreateOptions {
                is_directory: true,
                ..Default::default()
            },
        )
        .unwrap();
        ZeroLengthFileChecker.check(&mut ws, "figs").unwrap();
        assert!(ws.exists("figs"));
    }
}
