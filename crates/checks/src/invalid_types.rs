//! Checks for file and source types that cannot be accepted

use sourcemill_core::{FileType, Result, SourceType};
use sourcemill_workspace::{Checker, Workspace};

/// Code for docx submissions.
pub const DOCX_NOT_SUPPORTED: &str = "docx_not_supported";
/// Code for ODF submissions.
pub const ODF_NOT_SUPPORTED: &str = "odf_not_supported";
/// Code for single encapsulated PostScript submissions.
pub const EPS_NOT_SUPPORTED: &str = "eps_not_supported";
/// Code for a lone auxiliary TeX file.
pub const SINGLE_AUX_TEX: &str = "single_auxiliary_tex_file";
/// Code for RAR archives.
pub const RAR_NOT_SUPPORTED: &str = "rar_not_supported";

const DOCX_MESSAGE: &str = "Submissions in docx are no longer supported. Please create a PDF \
     file and submit that instead. Server side conversion of .docx to PDF may lead to \
     incorrect font substitutions, among other problems, and your own PDF is likely to be \
     more accurate.";

const ODF_MESSAGE: &str =
    "Unfortunately arXiv does not support ODF. Please submit PDF instead.";

const EPS_MESSAGE: &str = "This file appears to be a single encapsulated PostScript file.";

const SINGLE_AUX_TEX_MESSAGE: &str = "This file appears to be a single auxiliary TeX file.";

const RAR_MESSAGE: &str =
    "We do not support 'rar' files. Please use 'zip' or 'tar' instead.";

/// Flags single-file submissions whose format is refused outright.
#[derive(Debug, Default)]
pub struct FlagInvalidSourceTypes;

impl Checker for FlagInvalidSourceTypes {
    fn name(&self) -> &'static str {
        "FlagInvalidSourceTypes"
    }

    fn check_typed(
        &self,
        workspace: &mut Workspace,
        path: &str,
        file_type: FileType,
    ) -> Result<()> {
        if workspace.index().file_count() != 1 {
            return Ok(());
        }
        let (code, message) = match file_type {
            FileType::Docx => (DOCX_NOT_SUPPORTED, DOCX_MESSAGE),
            FileType::Odf => (ODF_NOT_SUPPORTED, ODF_MESSAGE),
            FileType::DosEps => (EPS_NOT_SUPPORTED, EPS_MESSAGE),
            FileType::Texaux => (SINGLE_AUX_TEX, SINGLE_AUX_TEX_MESSAGE),
            _ => return Ok(()),
        };
        workspace.set_source_type(SourceType::Invalid);
        workspace.add_error(path, code, message);
        Ok(())
    }
}

/// Flags file types that are never accepted regardless of count.
#[derive(Debug, Default)]
pub struct FlagInvalidFileTypes;

impl Checker for FlagInvalidFileTypes {
    fn name(&self) -> &'static str {
        "FlagInvalidFileTypes"
    }

    fn check_typed(
        &self,
        workspace: &mut Workspace,
        path: &str,
        file_type: FileType,
    ) -> Result<()> {
        if file_type == FileType::Rar {
            workspace.add_error(path, RAR_NOT_SUPPORTED, RAR_MESSAGE);
        }
        Ok(())
    }
}
