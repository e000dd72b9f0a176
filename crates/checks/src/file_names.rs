//! Check for and fix malformed or disallowed filenames

use once_cell::sync::Lazy;
use regex::Regex;
use sourcemill_core::{path as relpath, Result};
use sourcemill_workspace::{Checker, Workspace};

/// Code shared by the illegal-character checkers.
pub const ILLEGAL_CHARACTERS: &str = "filename_illegal_characters";
/// Code for repaired Windows-style names.
pub const FIXED_WINDOWS_NAME: &str = "fixed_windows_name";
/// Code for possible editor backup files.
pub const BACKUP_FILE: &str = "possible_backup_file";
/// Code for leading-hyphen renames.
pub const LEADING_HYPHEN: &str = "filename_leading_hyphen";

static WINDOWS_FILE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]:\\(.*\\)?").expect("static pattern"));
static TEX_BACKUP_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(.+)\.(tex_|tex\.bak|tex~)$").expect("static pattern"));
static ILLEGAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w+\-.=,]").expect("static pattern"));

/// Checks for and fixes Windows-style filenames.
#[derive(Debug, Default)]
pub struct FixWindowsFileNames;

impl Checker for FixWindowsFileNames {
    fn name(&self) -> &'static str {
        "FixWindowsFileNames"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        let file = workspace.file(path)?;
        if WINDOWS_FILE_PREFIX.is_match(&file.path) {
            let prev_name = file.name().to_string();
            let new_name = WINDOWS_FILE_PREFIX.replace(&prev_name, "").into_owned();
            let new_path = relpath::join(file.dir(), &new_name);
            let new_path = workspace.rename(path, &new_path)?;
            workspace.add_warning_non_persistent(
                &new_path,
                FIXED_WINDOWS_NAME,
                format!("Renamed '{}' to '{}'.", prev_name, new_name),
            );
        }
        Ok(())
    }
}

/// Checks for possible TeX backup files.
///
/// Runs before the tilde is translated to an underscore; afterwards the
/// pattern can no longer match.
#[derive(Debug, Default)]
pub struct WarnAboutTeXBackupFiles;

impl Checker for WarnAboutTeXBackupFiles {
    fn name(&self) -> &'static str {
        "WarnAboutTeXBackupFiles"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        let file = workspace.file(path)?;
        if !file.is_ancillary && TEX_BACKUP_FILE.is_match(file.name()) {
            let message = format!(
                "File '{}' may be a backup file. Please inspect and remove extraneous backup files.",
                file.name()
            );
            workspace.add_warning(path, BACKUP_FILE, message);
        }
        Ok(())
    }
}

/// Checks for illegal characters and replaces them with underscores.
#[derive(Debug, Default)]
pub struct ReplaceIllegalCharacters;

impl Checker for ReplaceIllegalCharacters {
    fn name(&self) -> &'static str {
        "ReplaceIllegalCharacters"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        let file = workspace.file(path)?;
        if !file.is_directory && ILLEGAL.is_match(file.name()) {
            let prev_name = file.name().to_string();
            let new_name = ILLEGAL.replace_all(&prev_name, "_").into_owned();
            let new_path = relpath::join(file.dir(), &new_name);
            let new_path = workspace.rename(path, &new_path)?;
            workspace.add_warning_non_persistent(
                &new_path,
                ILLEGAL_CHARACTERS,
                format!(
                    "We only accept file names containing the characters: a-z A-Z 0-9 _ + - . =. Renamed '{}' to '{}'",
                    prev_name, new_name
                ),
            );
        }
        Ok(())
    }
}

/// Registers an error for files whose names still carry illegal
/// characters after the rename pass.
#[derive(Debug, Default)]
pub struct PanicOnIllegalCharacters;

impl Checker for PanicOnIllegalCharacters {
    fn name(&self) -> &'static str {
        "PanicOnIllegalCharacters"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        let file = workspace.file(path)?;
        if !file.is_directory && ILLEGAL.is_match(file.name()) {
            let message = format!(
                "Filename \"{}\" contains unwanted bad characters. The only allowed are a-z A-Z 0-9 _ + - . , =",
                file.name()
            );
            workspace.add_error(path, ILLEGAL_CHARACTERS, message);
        }
        Ok(())
    }
}

/// Checks for a leading hyphen and replaces it with an underscore.
#[derive(Debug, Default)]
pub struct ReplaceLeadingHyphen;

impl Checker for ReplaceLeadingHyphen {
    fn name(&self) -> &'static str {
        "ReplaceLeadingHyphen"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        let file = workspace.file(path)?;
        if file.name().starts_with('-') {
            let prev_name = file.name().to_string();
            let new_name = format!("_{}", &prev_name[1..]);
            let new_path = relpath::join(file.dir(), &new_name);
            let new_path = workspace.rename(path, &new_path)?;
            workspace.add_warning_non_persistent(
                &new_path,
                LEADING_HYPHEN,
                format!(
                    "We do not accept files starting with a hyphen. Renamed '{}' to '{}'.",
                    prev_name, new_name
                ),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{put, workspace};

    #[test]
    fn test_windows_path_stripped_to_basename() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "C:\\users\\me\\paper.tex", b"content");
        FixWindowsFileNames
            .check(&mut ws, "C:\\users\\me\\paper.tex")
            .unwrap();
        assert!(ws.exists("paper.tex"));
        assert!(!ws.exists("C:\\users\\me\\paper.tex"));
        assert_eq!(ws.read_file("paper.tex").unwrap(), b"content");
        assert!(ws
            .diagnostics()
            .get(FIXED_WINDOWS_NAME, "paper.tex")
            .is_some());
    }

    #[test]
    fn test_backup_file_warning_variants() {
        let (_dir, mut ws) = workspace();
        for name in ["paper.tex~", "paper.tex.bak", "paper.tex_"] {
            put(&mut ws, name, b"x");
            WarnAboutTeXBackupFiles.check(&mut ws, name).unwrap();
            assert!(
                ws.diagnostics().get(BACKUP_FILE, name).is_some(),
                "{name}"
            );
        }
        put(&mut ws, "paper.tex", b"x");
        WarnAboutTeXBackupFiles.check(&mut ws, "paper.tex").unwrap();
        assert!(ws.diagnostics().get(BACKUP_FILE, "paper.tex").is_none());
    }

    #[test]
    fn test_ancillary_backups_are_ignored() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "anc/paper.tex~", b"x");
        WarnAboutTeXBackupFiles
            .check(&mut ws, "anc/paper.tex~")
            .unwrap();
        assert!(ws.diagnostics().is_empty());
    }

    #[test]
    fn test_illegal_characters_replaced() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "my paper(v2).tex", b"same bytes");
        ReplaceIllegalCharacters
            .check(&mut ws, "my paper(v2).tex")
            .unwrap();
        assert!(ws.exists("my_paper_v2_.tex"));
        // Renaming must not disturb content.
        assert_eq!(ws.read_file("my_paper_v2_.tex").unwrap(), b"same bytes");
    }

    #[test]
    fn test_legal_names_left_alone() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "ok-name_1.2=a,b.tex", b"x");
        ReplaceIllegalCharacters
            .check(&mut ws, "ok-name_1.2=a,b.tex")
            .unwrap();
        assert!(ws.exists("ok-name_1.2=a,b.tex"));
        assert!(ws.diagnostics().is_empty());
    }

    #[test]
    fn test_panic_checker_flags_remaining_illegal_names() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "bad name.tex", b"x");
        PanicOnIllegalCharacters
            .check(&mut ws, "bad name.tex")
            .unwrap();
        let d = ws
            .diagnostics()
            .get(ILLEGAL_CHARACTERS, "bad name.tex")
            .unwrap();
        assert_eq!(d.severity, sourcemill_core::Severity::Fatal);
    }

    #[test]
    fn test_leading_hyphen_renamed() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "-output.tex", b"x");
        ReplaceLeadingHyphen.check(&mut ws, "-output.tex").unwrap();
        assert!(ws.exists("_output.tex"));
        assert!(ws.diagnostics().get(LEADING_HYPHEN, "_output.tex").is_some());
    }

    #[test]
    fn test_hyphen_inside_name_is_fine() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "my-output.tex", b"x");
        ReplaceLeadingHyphen.check(&mut ws, "my-output.tex").unwrap();
        assert!(ws.exists("my-output.tex"));
    }
}
