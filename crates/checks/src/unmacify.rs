//! Line-ending and termination cleanup
//!
//! Files written on Macs and Windows machines carry carriage returns that
//! break downstream TeX compilation. `unmacify` normalizes line endings
//! (CRLF for PC files, lone CR for Mac files), strips stray end-of-file
//! control characters, and warns when a file does not end in a newline.

use sourcemill_core::{FileType, Result};
use sourcemill_workspace::{Checker, Workspace};

/// Code for stripped end-of-file control characters.
pub const TRAILING_CHARACTER: &str = "trailing_character_stripped";
/// Code for a missing final newline.
pub const MISSING_NEWLINE: &str = "missing_trailing_newline";

/// Normalize line endings and file termination for `path`.
pub fn unmacify(workspace: &mut Workspace, path: &str) -> Result<()> {
    let original = workspace.read_file(path)?;
    if original.is_empty() {
        return Ok(());
    }

    let is_pc = original.windows(2).any(|w| w == b"\r\n");
    workspace.log_info(&format!(
        "Un{}ify file {}",
        if is_pc { "pc" } else { "mac" },
        path
    ));

    let mut fixed = if is_pc {
        // CRLF -> LF; a lone CR in a PC file is left alone.
        let mut out = Vec::with_capacity(original.len());
        let mut i = 0;
        while i < original.len() {
            if original[i] == b'\r' && original.get(i + 1) == Some(&b'\n') {
                i += 1;
                continue;
            }
            out.push(original[i]);
            i += 1;
        }
        out
    } else {
        // Mac line endings: every CR becomes LF.
        original
            .iter()
            .map(|&b| if b == b'\r' { b'\n' } else { b })
            .collect()
    };

    check_file_termination(workspace, path, &mut fixed);

    if fixed != original {
        workspace.write_file(path, &fixed)?;
    }
    Ok(())
}

/// Strip unwanted characters from the end of the buffer and warn about a
/// missing final newline. The legacy cleanup looked at the last two bytes
/// only; that window is kept.
fn check_file_termination(workspace: &mut Workspace, path: &str, bytes: &mut Vec<u8>) {
    const STRIP: [u8; 3] = [0x1A, 0x04, 0xFF];
    let len = bytes.len();
    if len == 0 {
        return;
    }

    let last = bytes[len - 1];
    let second_last = if len >= 2 { Some(bytes[len - 2]) } else { None };

    let mut found: Vec<u8> = Vec::new();
    if let Some(b) = second_last {
        if STRIP.contains(&b) {
            found.push(b);
            found.push(last);
            bytes.truncate(len - 2);
        }
    }
    if found.is_empty() && STRIP.contains(&last) {
        found.push(last);
        bytes.truncate(len - 1);
    }

    if !found.is_empty() {
        let mut message = String::new();
        if found.contains(&0x1A) {
            message.push_str("trailing ^Z ");
        }
        if found.contains(&0x04) {
            message.push_str("trailing ^D ");
        }
        if found.contains(&0xFF) {
            message.push_str("trailing =FF ");
        }
        workspace.add_warning(
            path,
            TRAILING_CHARACTER,
            format!("{}stripped from {}.", message, path),
        );
    }

    if bytes.last() != Some(&b'\n') {
        workspace.add_warning(
            path,
            MISSING_NEWLINE,
            format!(
                "File '{}' does not end with newline (\\n), TRUNCATED?",
                path
            ),
        );
    }
}

/// UnMac-ifies TeX source, HTML, and PC/Mac-flavored files.
#[derive(Debug, Default)]
pub struct UnMacify;

impl Checker for UnMacify {
    fn name(&self) -> &'static str {
        "UnMacify"
    }

    fn check(&self, workspace: &mut Workspace, path: &str) -> Result<()> {
        if workspace.file(path)?.is_tex_type() {
            unmacify(workspace, path)?;
        }
        Ok(())
    }

    fn check_typed(
        &self,
        workspace: &mut Workspace,
        path: &str,
        file_type: FileType,
    ) -> Result<()> {
        if matches!(file_type, FileType::Html | FileType::Pc | FileType::Mac) {
            unmacify(workspace, path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{put, workspace};

    #[test]
    fn test_crlf_normalized() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "pc.tex", b"line one\r\nline two\r\n");
        unmacify(&mut ws, "pc.tex").unwrap();
        assert_eq!(ws.read_file("pc.tex").unwrap(), b"line one\nline two\n");
    }

    #[test]
    fn test_mac_cr_normalized() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "mac.tex", b"line one\rline two\r");
        unmacify(&mut ws, "mac.tex").unwrap();
        assert_eq!(ws.read_file("mac.tex").unwrap(), b"line one\nline two\n");
    }

    #[test]
    fn test_clean_file_untouched() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "clean.tex", b"line one\nline two\n");
        unmacify(&mut ws, "clean.tex").unwrap();
        assert_eq!(ws.read_file("clean.tex").unwrap(), b"line one\nline two\n");
        assert!(ws.diagnostics().is_empty());
    }

    #[test]
    fn test_trailing_control_characters_stripped() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "a.tex", b"content\n\x1a\n");
        unmacify(&mut ws, "a.tex").unwrap();
        assert_eq!(ws.read_file("a.tex").unwrap(), b"content\n");
        let d = ws.diagnostics().get(TRAILING_CHARACTER, "a.tex").unwrap();
        assert!(d.message.contains("^Z"));

        put(&mut ws, "b.tex", b"content\n\x04");
        unmacify(&mut ws, "b.tex").unwrap();
        assert_eq!(ws.read_file("b.tex").unwrap(), b"content\n");
        assert!(ws
            .diagnostics()
            .get(TRAILING_CHARACTER, "b.tex")
            .unwrap()
            .message
            .contains("^D"));
    }

    #[test]
    fn test_missing_final_newline_warns() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "trunc.tex", b"no newline at end");
        unmacify(&mut ws, "trunc.tex").unwrap();
        assert!(ws
            .diagnostics()
            .get(MISSING_NEWLINE, "trunc.tex")
            .unwrap()
            .message
            .contains("TRUNCATED"));
    }

    #[test]
    fn test_idempotent() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "a.tex", b"one\r\ntwo\r\n\x1a\n");
        unmacify(&mut ws, "a.tex").unwrap();
        let after_first = ws.read_file("a.tex").unwrap();
        unmacify(&mut ws, "a.tex").unwrap();
        assert_eq!(ws.read_file("a.tex").unwrap(), after_first);
    }

    #[test]
    fn test_checker_dispatch() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "page.html", b"<html>\r\n</html>\r\n");
        ws.set_file_type("page.html", FileType::Html).unwrap();
        UnMacify
            .check_typed(&mut ws, "page.html", FileType::Html)
            .unwrap();
        assert_eq!(ws.read_file("page.html").unwrap(), b"<html>\n</html>\n");

        put(&mut ws, "main.tex", b"\\def\\x{1}\r\n");
        ws.set_file_type("main.tex", FileType::Tex).unwrap();
        UnMacify.check(&mut ws, "main.tex").unwrap();
        assert_eq!(ws.read_file("main.tex").unwrap(), b"\\def\\x{1}\n");

        // Unrelated types pass through untouched.
        put(&mut ws, "fig.pdf", b"%PDF\r\n");
        UnMacify
            .check_typed(&mut ws, "fig.pdf", FileType::Pdf)
            .unwrap();
        assert_eq!(ws.read_file("fig.pdf").unwrap(), b"%PDF\r\n");
    }
}
