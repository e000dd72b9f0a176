//! Checks for domain-specific files that are disallowed or superseded
//!
//! Most of these remove files that conflict with the internal TeX tree:
//! hyperlink-incompatible styles, stale RevTeX copies, the time-bombed
//! diagrams package, demo files, and assorted debris that authors keep
//! including with their uploads.

use once_cell::sync::Lazy;
use regex::Regex;
use sourcemill_core::{path as relpath, FileType, Result};
use sourcemill_workspace::{Checker, Workspace};

/// Code shared by the removal checkers in this module.
pub const DISALLOWED_FILE: &str = "disallowed_file";
/// Code for suspicious espcrc2/lamuphys TeX files.
pub const DOT_TEX_DETECTED: &str = "dot_tex_detected";
/// Code for removed hyperlink-incompatible styles.
pub const HYPERLINK_COMPATIBLE: &str = "hyperlink_compatible_package";
/// Code for a `.bib` without its `.bbl`.
pub const BBL_MISSING: &str = "bbl_missing";
/// Code for the bibtex advisory note.
pub const BIB_NOTE: &str = "bib_file_note";
/// Code for MS Word uploads.
pub const MS_WORD_NOT_SUPPORTED: &str = "ms_word_not_supported";

fn disallowed_message(name: &str) -> String {
    format!("Removed file '{}' [File not allowed].", name)
}

static DOT_STY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(espcrc2|lamuphys)\.sty$").expect("static pattern"));
static DOT_TEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(espcrc2|lamuphys)\.tex$").expect("static pattern"));

/// Checks for and removes the hyperlink styles espcrc2 and lamuphys.
///
/// These styles conflict with the internal hypertex package.
#[derive(Debug, Default)]
pub struct RemoveHyperlinkStyleFiles;

impl Checker for RemoveHyperlinkStyleFiles {
    fn name(&self) -> &'static str {
        "RemoveHyperlinkStyleFiles"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        let name = workspace.file(path)?.name().to_string();
        if DOT_STY.is_match(&name) {
            let message = format!(
                "Found hyperlink-compatible package '{}'. Will remove and use hypertex-compatible local version",
                name
            );
            workspace.add_info(path, HYPERLINK_COMPATIBLE, &message);
            workspace.remove(path, &message)?;
        } else if DOT_TEX.is_match(&name) {
            workspace.add_warning(
                path,
                DOT_TEX_DETECTED,
                format!("Possible submitter error. Unwanted '{}'", name),
            );
        }
        Ok(())
    }
}

/// Checks for and removes known-bad file names.
#[derive(Debug, Default)]
pub struct RemoveDisallowedFiles;

const DISALLOWED_NAMES: &[&str] = &["uufiles", "core", "splread.1st"];

impl Checker for RemoveDisallowedFiles {
    fn name(&self) -> &'static str {
        "RemoveDisallowedFiles"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        let name = workspace.file(path)?.name().to_string();
        if DISALLOWED_NAMES.contains(&name.as_str()) {
            let message = disallowed_message(&name);
            workspace.add_info(path, DISALLOWED_FILE, &message);
            workspace.remove(path, &message)?;
        }
        Ok(())
    }
}

static XXX_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^xxx\.(rsrc$|finfo$|cshrc$|nfs)").expect("static pattern"));
static GF_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.[346]00gf$").expect("static pattern"));
static DESC_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.desc$").expect("static pattern"));

/// Checks for and removes a variety of meta files based on file names.
#[derive(Debug, Default)]
pub struct RemoveMetaFiles;

impl Checker for RemoveMetaFiles {
    fn name(&self) -> &'static str {
        "RemoveMetaFiles"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        let name = workspace.file(path)?.name().to_string();
        for pattern in [&*XXX_FILE, &*GF_FILE, &*DESC_FILE] {
            if pattern.is_match(&name) {
                let message = disallowed_message(&name);
                workspace.add_info(path, DISALLOWED_FILE, &message);
                workspace.remove(path, &message)?;
                break;
            }
        }
        Ok(())
    }
}

static BIB_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.bib$").expect("static pattern"));

const BIB_WITH_BBL_NOTE: &str = "We do not run bibtex in the auto - TeXing procedure. We do not \
     run bibtex because the .bib database files can be quite large, and the only thing necessary \
     to make the references for a given paper is the .bbl file.";

const BIB_NO_BBL_WARNING: &str = "We do not run bibtex in the auto - TeXing procedure. If you \
     use it, include in your submission the .bbl file which bibtex produces on your home \
     machine; otherwise your references will not come out correctly. We do not run bibtex \
     because the .bib database files can be quite large, and the only thing necessary to make \
     the references for a given paper is the .bbl file.";

/// Checks for `.bib` files and removes them when the matching `.bbl` is
/// present; otherwise the references are very likely missing and the
/// workspace is held in error until the `.bbl` arrives.
#[derive(Debug, Default)]
pub struct CheckForBibFile;

impl Checker for CheckForBibFile {
    fn name(&self) -> &'static str {
        "CheckForBibFile"
    }

    fn check_workspace(&self, workspace: &mut Workspace) -> Result<()> {
        let bib_paths: Vec<String> = workspace
            .live_check_paths()
            .into_iter()
            .filter(|p| BIB_FILE.is_match(relpath::basename(p)))
            .collect();
        for path in bib_paths {
            if !workspace.exists(&path) {
                continue;
            }
            self.check_bbl_sibling(workspace, &path)?;
        }
        Ok(())
    }
}

impl CheckForBibFile {
    fn check_bbl_sibling(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        let dir = relpath::parent(path).to_string();
        let base = relpath::strip_extension(relpath::basename(path)).to_string();
        let bbl_name = format!("{}.bbl", base);
        let bbl_path = relpath::join(&dir, &bbl_name);

        if workspace.exists(&bbl_path) {
            // The .bbl is all the compilation step needs; the database
            // would only bloat the package.
            let bib_name = relpath::basename(path).to_string();
            workspace.add_info(path, BIB_NOTE, BIB_WITH_BBL_NOTE);
            workspace.resolve_diagnostic(BBL_MISSING, path);
            workspace.remove(
                path,
                &format!(
                    "Removed the file '{}'. Using '{}' for references.",
                    bib_name, bbl_name
                ),
            )?;
            workspace.add_info(
                &bbl_path,
                "bib_file_removed",
                format!(
                    "Removed the file '{}'. Using '{}' for references.",
                    bib_name, bbl_name
                ),
            );
        } else {
            workspace.add_warning(path, BIB_NOTE, BIB_NO_BBL_WARNING);
            workspace.add_error(
                path,
                BBL_MISSING,
                format!(
                    "Your submission contained {base}.bib file, but no {base}.bbl file \
                     (include {base}.bbl, or submit without {base}.bib; and remember to \
                     verify references).",
                    base = base
                ),
            );
        }
        Ok(())
    }
}

static EXTRANEOUS_REVTEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(10pt\.rtx|11pt\.rtx|12pt\.rtx|aps\.rtx|revsymb\.sty|revtex4\.cls|rmp\.rtx)$")
        .expect("static pattern")
});

const REVTEX_WARNING: &str = "WILL REMOVE standard revtex4 style files from this submission. \
     revtex4 is now fully supported by arXiv and all its mirrors, for details see the \
     <a href=\"/help/faq/revtex\">RevTeX FAQ</a>. If you have modified these files in any way \
     then you must rename them before attempting to include them with your submission.";

/// Checks for and removes RevTeX files already shipped with the TeX tree.
#[derive(Debug, Default)]
pub struct RemoveExtraneousRevTeXFiles;

impl Checker for RemoveExtraneousRevTeXFiles {
    fn name(&self) -> &'static str {
        "RemoveExtraneousRevTeXFiles"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        let name = workspace.file(path)?.name().to_string();
        if EXTRANEOUS_REVTEX.is_match(&name) {
            workspace.add_info(path, DISALLOWED_FILE, REVTEX_WARNING);
            workspace.remove(path, REVTEX_WARNING)?;
        }
        Ok(())
    }
}

static DIAGRAMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^diagrams\.(sty|tex)$").expect("static pattern"));

const DIAGRAMS_WARNING: &str = "Removed standard style files for Paul Taylor's diagrams \
     package. This package is supported in arXiv's TeX tree and the style files are thus \
     unnecessary. Furthermore, they include 'time-bomb' code which will render submissions \
     that include them unprocessable at some time in the future.";

/// Checks for and removes the diagrams package.
///
/// The upstream package stops working after a built-in expiry date; the
/// internal copy has that disabled.
#[derive(Debug, Default)]
pub struct RemoveDiagramsPackage;

impl Checker for RemoveDiagramsPackage {
    fn name(&self) -> &'static str {
        "RemoveDiagramsPackage"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        let name = workspace.file(path)?.name().to_string();
        if DIAGRAMS.is_match(&name) {
            workspace.add_info(path, DISALLOWED_FILE, DIAGRAMS_WARNING);
            workspace.remove(path, DIAGRAMS_WARNING)?;
        }
        Ok(())
    }
}

const AA_DEM_MESSAGE: &str = "Removed file 'aa.dem' on the assumption that it is the example \
     file for the Astronomy and Astrophysics macro package aa.cls.";

/// Checks for and removes the Astronomy and Astrophysics demo file.
#[derive(Debug, Default)]
pub struct RemoveAADemoFile;

impl Checker for RemoveAADemoFile {
    fn name(&self) -> &'static str {
        "RemoveAADemoFile"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        if workspace.file(path)?.name() == "aa.dem" {
            workspace.add_info(path, DISALLOWED_FILE, AA_DEM_MESSAGE);
            workspace.remove(path, AA_DEM_MESSAGE)?;
        }
        Ok(())
    }
}

const MISSFONT_MESSAGE: &str = "Removed file 'missfont.log'. Detected 'missfont.log' file in \
     uploaded files. This may indicate a problem with the fonts your submission uses. Please \
     correct any issues with fonts and be sure to examine the fonts in the final preview PDF \
     that our system generates.";

/// Checks for and removes the `missfont.log` file.
#[derive(Debug, Default)]
pub struct RemoveMissingFontFile;

impl Checker for RemoveMissingFontFile {
    fn name(&self) -> &'static str {
        "RemoveMissingFontFile"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        if workspace.file(path)?.name() == "missfont.log" {
            workspace.add_info(path, DISALLOWED_FILE, MISSFONT_MESSAGE);
            workspace.remove(path, MISSFONT_MESSAGE)?;
        }
        Ok(())
    }
}

static SYNCTEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.synctex$").expect("static pattern"));

/// Checks for and removes SyncTeX files; a different engine produces
/// them and they can be large.
#[derive(Debug, Default)]
pub struct RemoveSyncTeXFiles;

impl Checker for RemoveSyncTeXFiles {
    fn name(&self) -> &'static str {
        "RemoveSyncTeXFiles"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        let name = workspace.file(path)?.name().to_string();
        if SYNCTEX.is_match(&name) {
            let message = format!(
                "Removed file '{}'. SyncTeX files are not used by our system and may be large.",
                name
            );
            workspace.add_info(path, DISALLOWED_FILE, &message);
            workspace.remove(path, &message)?;
        }
        Ok(())
    }
}

static TGZ_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([.\-]t?[ga]?z)$").expect("static pattern"));

/// Strips compression suffixes from file names so the unpacked name does
/// not collide with the archive it came from.
#[derive(Debug, Default)]
pub struct FixTGZFileName;

impl Checker for FixTGZFileName {
    fn name(&self) -> &'static str {
        "FixTGZFileName"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        let file = workspace.file(path)?;
        if file.is_directory {
            return Ok(());
        }
        let name = file.name().to_string();
        if let Some(m) = TGZ_SUFFIX.find(&name) {
            let new_name = &name[..m.start()];
            if new_name.is_empty() {
                return Ok(());
            }
            let new_path = relpath::join(workspace.file(path)?.dir(), new_name);
            workspace.rename(path, &new_path)?;
        }
        Ok(())
    }
}

const DOC_WARNING: &str = "Your submission has been rejected because it contains one or more \
     files with extension .doc, assumed to be MSWord files. Sadly, MSWord is not an acceptable \
     submission format: see <a href=\"/help/submit\">submission help</a> for details of \
     accepted formats. If your document was created using MSWord then it is probably best to \
     submit as PDF (MSWord can produce marginal and/or non-compliant PostScript). If your \
     submission includes files with extension .doc which are not MSWord documents, please \
     rename to a different extension and resubmit.";

/// Flags `.doc` files that failed type identification. The file stays in
/// place; the fatal diagnostic blocks the submission.
#[derive(Debug, Default)]
pub struct RemoveDOCFiles;

impl Checker for RemoveDOCFiles {
    fn name(&self) -> &'static str {
        "RemoveDOCFiles"
    }

    fn check_typed(
        &self,
        workspace: &mut Workspace,
        path: &str,
        file_type: FileType,
    ) -> Result<()> {
        if file_type == FileType::Failed && path.ends_with(".doc") {
            workspace.add_error(path, MS_WORD_NOT_SUPPORTED, DOC_WARNING);
        }
        Ok(())
    }
}
