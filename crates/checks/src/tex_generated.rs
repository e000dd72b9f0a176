//! Check for and eliminate files generated by TeX compilation

use once_cell::sync::Lazy;
use regex::Regex;
use sourcemill_core::{path as relpath, FileType, Result};
use sourcemill_workspace::{Checker, Workspace};

/// Code for a generated file shadowing its TeX source.
pub const NAME_CONFLICT: &str = "name_conflict";
/// Code for DVI files in the source.
pub const DVI_NOT_ALLOWED: &str = "dvi_not_allowed";

static TEX_PRODUCED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(.+)\.(log|aux|out|blg|dvi|ps|pdf)$").expect("static pattern"));

/// Detects TeX compilation products sitting next to their `.tex` source
/// and removes them; keeping them corrupts recompilation.
#[derive(Debug, Default)]
pub struct RemoveTeXGeneratedFiles;

impl Checker for RemoveTeXGeneratedFiles {
    fn name(&self) -> &'static str {
        "RemoveTeXGeneratedFiles"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        let file = workspace.file(path)?;
        let name = file.name().to_string();
        let dir = file.dir().to_string();
        if TEX_PRODUCED.is_match(&name) {
            let base = relpath::strip_extension(&name).to_string();
            let tex_file = relpath::join(&dir, &format!("{}.tex", base));
            let ucase_tex_file = relpath::join(&dir, &format!("{}.TEX", base));
            if workspace.exists(&tex_file) || workspace.exists(&ucase_tex_file) {
                let message = format!("Removed file '{}' due to name conflict.", name);
                workspace.add_info(path, NAME_CONFLICT, &message);
                workspace.remove(path, &message)?;
            }
        }
        Ok(())
    }
}

/// Generates an error for DVI files: the TeX source is wanted instead.
#[derive(Debug, Default)]
pub struct DisallowDVIFiles;

impl Checker for DisallowDVIFiles {
    fn name(&self) -> &'static str {
        "DisallowDVIFiles"
    }

    fn check_typed(
        &self,
        workspace: &mut Workspace,
        path: &str,
        file_type: FileType,
    ) -> Result<()> {
        if file_type != FileType::Dvi {
            return Ok(());
        }
        let file = workspace.file(path)?;
        if !file.is_ancillary {
            let message = format!(
                "{} is a TeX-produced DVI file. Please submit the TeX source instead.",
                file.name()
            );
            workspace.add_error(path, DVI_NOT_ALLOWED, message);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{put, workspace};
    use sourcemill_core::Severity;

    #[test]
    fn test_generated_file_with_tex_sibling_removed() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "main.tex", b"source");
        put(&mut ws, "main.log", b"log");
        put(&mut ws, "main.pdf", b"%PDF");
        RemoveTeXGeneratedFiles.check(&mut ws, "main.log").unwrap();
        RemoveTeXGeneratedFiles.check(&mut ws, "main.pdf").unwrap();
        assert!(!ws.exists("main.log"));
        assert!(!ws.exists("main.pdf"));
        assert!(ws.exists("main.tex"));
    }

    #[test]
    fn test_generated_file_without_sibling_kept() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "standalone.pdf", b"%PDF");
        RemoveTeXGeneratedFiles
            .check(&mut ws, "standalone.pdf")
            .unwrap();
        assert!(ws.exists("standalone.pdf"));
    }

    #[test]
    fn test_uppercase_tex_sibling_counts() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "MAIN.TEX", b"source");
        put(&mut ws, "MAIN.dvi", b"dvi");
        RemoveTeXGeneratedFiles.check(&mut ws, "MAIN.dvi").unwrap();
        assert!(!ws.exists("MAIN.dvi"));
    }

    #[test]
    fn test_sibling_matching_is_per_directory() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "main.tex", b"source");
        put(&mut ws, "sub/main.pdf", b"%PDF");
        RemoveTeXGeneratedFiles
            .check(&mut ws, "sub/main.pdf")
            .unwrap();
        assert!(ws.exists("sub/main.pdf"));
    }

    #[test]
    fn test_dvi_error_for_source_files_only() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "paper.dvi", b"\xf7\x02");
        DisallowDVIFiles
            .check_typed(&mut ws, "paper.dvi", FileType::Dvi)
            .unwrap();
        let d = ws.diagnostics().get(DVI_NOT_ALLOWED, "paper.dvi").unwrap();
        assert_eq!(d.severity, Severity::Fatal);

        put(&mut ws, "anc/extra.dvi", b"\xf7\x02");
        DisallowDVIFiles
            .check_typed(&mut ws, "anc/extra.dvi", FileType::Dvi)
            .unwrap();
        assert!(ws.diagnostics().get(DVI_NOT_ALLOWED, "anc/extra.dvi").is_none());
    }
}
