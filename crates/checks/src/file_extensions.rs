//! Checks and fixes filename extensions for known formats
//!
//! Downstream processing picks its handler from the extension, so files
//! whose detected type disagrees with their name are renamed: PostScript
//! to `.ps`, PDF to `.pdf`, HTML to `.html`.

use sourcemill_core::{path as relpath, FileType, Result};
use sourcemill_workspace::{Checker, Workspace};

/// Code for extension repairs.
pub const RENAMED_EXTENSION: &str = "renamed_file_extension";

/// Renames files so the extension matches the detected type.
#[derive(Debug, Default)]
pub struct FixFileExtensions;

impl FixFileExtensions {
    fn change_extension(
        &self,
        workspace: &mut Workspace,
        path: &str,
        extension: &str,
    ) -> Result<()> {
        let file = workspace.file(path)?;
        let former_name = file.name().to_string();
        let dir = file.dir().to_string();
        let base = relpath::strip_extension(&former_name).to_string();
        let new_name = format!("{}.{}", base, extension);
        let new_path = relpath::join(&dir, &new_name);
        let new_path = workspace.rename(path, &new_path)?;
        workspace.add_warning_non_persistent(
            &new_path,
            RENAMED_EXTENSION,
            format!("Renamed '{}' to {}.", former_name, new_name),
        );
        Ok(())
    }
}

impl Checker for FixFileExtensions {
    fn name(&self) -> &'static str {
        "FixFileExtensions"
    }

    fn check_typed(
        &self,
        workspace: &mut Workspace,
        path: &str,
        file_type: FileType,
    ) -> Result<()> {
        let ext = workspace.file(path)?.ext().to_string();
        match file_type {
            FileType::Postscript if ext != "ps" => self.change_extension(workspace, path, "ps"),
            FileType::Pdf if ext != "pdf" => self.change_extension(workspace, path, "pdf"),
            FileType::Html if ext != "html" => self.change_extension(workspace, path, "html"),
            _ => Ok(()),
        }
    }
}
