//! Aggregate source-type classification
//!
//! Recomputed once per check pass from the per-file type tallies. The
//! single-file case is a strict case split; multi-file workspaces are
//! classified HTML or PostScript only when every active file fits the
//! respective companion set, and default to TeX otherwise.

use sourcemill_core::{FileType, Result, SourceType};
use sourcemill_workspace::{Checker, IterOptions, Workspace};
use tracing::debug;

/// Code for the all-files-ignored case.
pub const ALL_FILES_IGNORE: &str = "all_files_auto_ignore";
/// Code for a single file whose type could not be determined.
pub const UNKNOWN_FILE_TYPE: &str = "unknown_file_type";

const ALL_IGNORE_MESSAGE: &str = "All files are auto-ignore. If you intended to withdraw the \
     article, please use the 'withdraw' function from the list of articles on your account \
     page.";

/// Types that may accompany an HTML submission.
const HTML_COMPANIONS: &[FileType] = &[
    FileType::Html,
    FileType::Image,
    FileType::Include,
    FileType::Postscript,
    FileType::Pdf,
    FileType::Directory,
    FileType::Readme,
];

/// Types that may accompany a PostScript submission.
const POSTSCRIPT_COMPANIONS: &[FileType] = &[
    FileType::Postscript,
    FileType::Pdf,
    FileType::Ignore,
    FileType::Directory,
    FileType::Image,
];

/// Determines the source type for the workspace as a whole.
#[derive(Debug, Default)]
pub struct InferSourceType;

impl Checker for InferSourceType {
    fn name(&self) -> &'static str {
        "InferSourceType"
    }

    fn check_workspace(&self, workspace: &mut Workspace) -> Result<()> {
        let counts = workspace.index().type_counts();

        if counts.files == 0 {
            // Everything removed or only ancillary files present. Users
            // may legitimately clear their workspace, so no message.
            debug!("workspace has no active files; source type invalid");
            workspace.set_source_type(SourceType::Invalid);
            return Ok(());
        }

        if counts.files == counts.count(FileType::Ignore) {
            workspace.set_source_type(SourceType::Invalid);
            workspace.add_non_file_warning(ALL_FILES_IGNORE, ALL_IGNORE_MESSAGE);
            return Ok(());
        }

        if counts.files == 1 {
            self.classify_single_file(workspace)?;
            return Ok(());
        }

        let active: Vec<FileType> = workspace
            .iter_files(IterOptions {
                allow_directories: true,
                ..Default::default()
            })
            .iter()
            .map(|f| f.file_type)
            .collect();

        let html_fits = counts.count(FileType::Html) > 0
            && active.iter().all(|t| HTML_COMPANIONS.contains(t));
        let postscript_fits = counts.count(FileType::Postscript) > 0
            && active.iter().all(|t| POSTSCRIPT_COMPANIONS.contains(t));

        let source_type = if html_fits {
            SourceType::Html
        } else if postscript_fits {
            SourceType::Postscript
        } else {
            SourceType::Tex
        };
        debug!(source_type = %source_type, "classified multi-file workspace");
        workspace.set_source_type(source_type);
        Ok(())
    }
}

impl InferSourceType {
    fn classify_single_file(&self, workspace: &mut Workspace) -> Result<()> {
        let (path, file_type) = match workspace.index().single_file() {
            Some(f) => (f.path.clone(), f.file_type),
            None => return Ok(()),
        };
        let source_type = if file_type.is_tex() {
            SourceType::Tex
        } else {
            match file_type {
                FileType::Postscript => SourceType::Postscript,
                FileType::Pdf => SourceType::Pdf,
                FileType::Html => SourceType::Html,
                // Format-specific refusals attach their own diagnostics.
                FileType::Docx
                | FileType::Odf
                | FileType::DosEps
                | FileType::Texaux
                | FileType::Rar => SourceType::Invalid,
                FileType::Unknown => return Ok(()),
                _ => {
                    if file_type == FileType::Failed {
                        workspace.add_error(
                            &path,
                            UNKNOWN_FILE_TYPE,
                            "Could not determine file type.",
                        );
                    }
                    SourceType::Invalid
                }
            }
        };
        workspace.set_source_type(source_type);
        Ok(())
    }
}
