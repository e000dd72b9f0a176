//! Assigns a semantic type to files that do not have one yet

use sourcemill_core::{FileType, Result};
use sourcemill_workspace::{Checker, Workspace};

use crate::infer;

/// Runs type inference over files whose type is still unknown.
#[derive(Debug, Default)]
pub struct InferFileType;

impl Checker for InferFileType {
    fn name(&self) -> &'static str {
        "InferFileType"
    }

    fn check_typed(
        &self,
        workspace: &mut Workspace,
        path: &str,
        file_type: FileType,
    ) -> Result<()> {
        if file_type != FileType::Unknown {
            return Ok(());
        }
        let found = infer::infer_file_type(workspace, path)?;
        workspace.set_file_type(path, found)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{put, workspace};

    #[test]
    fn test_assigns_type_once() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "main.tex", b"\\documentclass{article}\n");
        InferFileType
            .check_typed(&mut ws, "main.tex", FileType::Unknown)
            .unwrap();
        assert_eq!(ws.file("main.tex").unwrap().file_type, FileType::Latex2e);
    }

    #[test]
    fn test_known_types_are_left_alone() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "fig.pdf", b"%PDF-1.4");
        ws.set_file_type("fig.pdf", FileType::Postscript).unwrap();
        // Already typed; a second run must not re-infer.
        InferFileType
            .check_typed(&mut ws, "fig.pdf", FileType::Postscript)
            .unwrap();
        assert_eq!(ws.file("fig.pdf").unwrap().file_type, FileType::Postscript);
    }

    #[test]
    fn test_unidentifiable_content_fails() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "blob.xyz", b"no recognizable structure");
        InferFileType
            .check_typed(&mut ws, "blob.xyz", FileType::Unknown)
            .unwrap();
        assert_eq!(ws.file("blob.xyz").unwrap().file_type, FileType::Failed);
    }
}
