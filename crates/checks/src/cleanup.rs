//! Format-specific cleanup and repair for PostScript and DOS EPS files
//!
//! PostScript files arrive with embedded Photoshop blocks, preview
//! bitmaps, thumbnails, corrupt headers, and TIFF bitmaps bolted on at
//! either end. These checkers strip or repair what they can; every repair
//! is announced with a warning and the file keeps its path.

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use sourcemill_core::{path as relpath, FileType, Result};
use sourcemill_storage::PathContext;
use sourcemill_workspace::{Checker, Workspace};
use tracing::debug;

use crate::infer;
use crate::unmacify::unmacify;

/// Code for repaired PostScript headers.
pub const POSTSCRIPT_REPAIRED: &str = "postscript_repaired";
/// Code for headers repaired on unidentified files.
pub const POSTSCRIPT_HEADER: &str = "postscript_header";
/// Code for removed trailing TIFF bitmaps in PostScript.
pub const TRAILING_TIFF_REMOVED: &str = "trailing_tiff_removed";
/// Code for DOS EPS files whose leading TIFF was stripped.
pub const LEADING_TIFF_STRIPPED: &str = "leading_tiff_stripped";
/// Code for DOS EPS files whose trailing TIFF was stripped.
pub const TRAILING_TIFF_STRIPPED: &str = "trailing_tiff_stripped";
/// Code for DOS EPS files that could not be stripped.
pub const TIFF_STRIP_FAILED: &str = "tiff_strip_failed";

const PHOTOSHOP: &str = "Photoshop";
const PREVIEW: &str = "Preview";
const THUMBNAIL: &str = "Thumbnail";

static EMBED_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Thumbnail:|BeginPreview|BeginPhotoshop").expect("static pattern")
});
static EOF_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^%%EOF").expect("static pattern"));
static TIFF_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(II\*\x00|MM\x00\*)").expect("static pattern"));
static PS_SECTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^%!PS").expect("static pattern"));
static PS_EXTENSION: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"(?i)\.e?psi?$").expect("static pattern"));

static CASE_1: Lazy<Regex> = Lazy::new(|| Regex::new(r"^%*\x04%!").expect("static pattern"));
static CASE_2: Lazy<Regex> = Lazy::new(|| Regex::new(r"^%%!").expect("static pattern"));
static CASE_3: Lazy<Regex> = Lazy::new(|| Regex::new(r"%!PS-Adobe-").expect("static pattern"));
static HEADER_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"^%!").expect("static pattern"));

/// Split a buffer into lines, each keeping its trailing newline.
fn lines(bytes: &[u8]) -> Vec<&[u8]> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\n' {
            out.push(&bytes[start..=i]);
            start = i + 1;
        }
    }
    if start < bytes.len() {
        out.push(&bytes[start..]);
    }
    out
}

/// Checks and cleanup for PostScript files.
#[derive(Debug, Default)]
pub struct CleanupPostScript;

impl Checker for CleanupPostScript {
    fn name(&self) -> &'static str {
        "CleanupPostScript"
    }

    fn check_typed(
        &self,
        workspace: &mut Workspace,
        path: &str,
        file_type: FileType,
    ) -> Result<()> {
        match file_type {
            FileType::Postscript => {
                unmacify(workspace, path)?;
                check_postscript(workspace, path)
            }
            FileType::PsPc => {
                repair_postscript(workspace, path)?;
                Ok(())
            }
            FileType::Failed if PS_EXTENSION.is_match(path) => check_postscript(workspace, path),
            _ => Ok(()),
        }
    }
}

/// Inspect a PostScript file for unwanted inclusions and repair what can
/// be repaired.
fn check_postscript(workspace: &mut Workspace, path: &str) -> Result<()> {
    if workspace.file(path)?.file_type == FileType::Failed {
        // Extraneous leading bytes keep the file from identifying as
        // PostScript at all; try a header repair first.
        let header = repair_postscript(workspace, path)?;
        if !header.is_empty() {
            workspace.add_warning(
                path,
                POSTSCRIPT_HEADER,
                format!(
                    "File '{}' did not have proper Postscript header, repaired to '{}'.",
                    path, header
                ),
            );
        }
    }

    workspace.log_info(&format!("Check Postscript: '{}'", relpath::basename(path)));
    let bytes = workspace.read_file(path)?;
    let mut kinds = Vec::new();
    for m in EMBED_MARKERS.find_iter(&bytes) {
        let kind = match m.as_bytes() {
            b if b.eq_ignore_ascii_case(b"BeginPhotoshop") => PHOTOSHOP,
            b if b.eq_ignore_ascii_case(b"BeginPreview") => PREVIEW,
            _ => THUMBNAIL,
        };
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    for kind in kinds {
        strip_preview(workspace, path, kind)?;
    }

    strip_trailing_tiff(workspace, path)?;
    Ok(())
}

/// Remove one embedded preview block from a PostScript file.
fn strip_preview(workspace: &mut Workspace, path: &str, kind: &str) -> Result<()> {
    let (start_re, end_re): (Regex, Regex) = match kind {
        PHOTOSHOP => (
            Regex::new(r"^%BeginPhotoshop").expect("static pattern"),
            Regex::new(r"^%EndPhotoshop").expect("static pattern"),
        ),
        PREVIEW => (
            Regex::new(r"^%%BeginPreview").expect("static pattern"),
            Regex::new(r"^%%EndPreview").expect("static pattern"),
        ),
        _ => (
            Regex::new(r"Thumbnail").expect("static pattern"),
            Regex::new(r"^%%EndData").expect("static pattern"),
        ),
    };

    workspace.log_info(&format!(
        "Strip embedded '{}' from file '{}'.",
        kind,
        relpath::basename(path)
    ));

    let bytes = workspace.read_file(path)?;
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut retain = true;
    let mut start_line = 0usize;
    let mut end_line = 0usize;
    for (line_no, line) in lines(&bytes).iter().enumerate() {
        if retain && start_re.is_match(line) {
            start_line = line_no + 1;
            retain = false;
        }
        if retain {
            out.extend_from_slice(line);
        }
        if !retain && end_re.is_match(line) {
            end_line = line_no + 1;
            retain = true;
            // Some generators glue the next comment onto the end marker
            // line with a bare CR; keep such lines.
            if line.windows(3).any(|w| w == b"\r%%") {
                out.extend_from_slice(line);
            }
        }
    }

    let name = relpath::basename(path).to_string();
    if retain && start_line > 0 {
        let orig_size = bytes.len();
        let new_size = out.len();
        workspace.write_file(path, &out)?;
        workspace.add_warning(
            path,
            &format!("stripped_{}", kind.to_lowercase()),
            format!(
                "Unnecessary {} removed from '{}' from line {} to line {}, \
                 Reduced from {} bytes to {} bytes (see http://arxiv.org/help/sizes)",
                kind, name, start_line, end_line, orig_size, new_size
            ),
        );
    } else if start_line > 0 {
        // Start marker with no end marker; leave the file alone.
        workspace.add_warning(
            path,
            &format!("stripped_{}", kind.to_lowercase()),
            format!("{} had unpaired {}", name, kind),
        );
    }
    Ok(())
}

/// Truncate a TIFF bitmap bolted onto the end of a PostScript file.
fn strip_trailing_tiff(workspace: &mut Workspace, path: &str) -> Result<()> {
    let bytes = workspace.read_file(path)?;
    let mut offset = 0usize;
    let mut truncate_at: Option<usize> = None;
    let mut seen_eof = false;
    for line in lines(&bytes) {
        if seen_eof {
            if TIFF_MARKER.is_match(line) {
                truncate_at = Some(offset);
            }
            break;
        }
        if EOF_MARKER.is_match(line) {
            seen_eof = true;
            offset += line.len();
            continue;
        }
        if TIFF_MARKER.is_match(line) {
            // No EOF marker before the bitmap; truncate where it starts.
            truncate_at = Some(offset);
            break;
        }
        offset += line.len();
    }

    if let Some(end) = truncate_at {
        workspace.write_file(path, &bytes[..end])?;
        workspace.add_warning(
            path,
            TRAILING_TIFF_REMOVED,
            format!(
                "Non-compliant attached TIFF removed from '{}'",
                relpath::basename(path)
            ),
        );
    }
    Ok(())
}

/// Repair simple corruptions at the beginning of a PostScript file.
///
/// Returns the (possibly repaired) header line, truncated to 75 bytes,
/// or an empty string when nothing was repaired.
pub fn repair_postscript(workspace: &mut Workspace, path: &str) -> Result<String> {
    let bytes = workspace.read_file(path)?;
    let all_lines = lines(&bytes);
    let orig_type = workspace.file(path)?.file_type;

    let mut fixed = false;
    let mut messages: Vec<&str> = Vec::new();
    let mut header: Vec<u8> = Vec::new();
    let mut header_index: Option<usize> = None;

    for (line_no, line) in all_lines.iter().enumerate() {
        let mut current: Vec<u8> = line.to_vec();
        if CASE_1.is_match(&current) {
            current = CASE_1.replace(&current, &b"%!"[..]).into_owned();
            fixed = true;
            messages.push("Removed carriage return from PS header.");
        }
        if CASE_2.is_match(&current) {
            current = CASE_2.replace(&current, &b"%!"[..]).into_owned();
            fixed = true;
            messages.push("Removed extra '%' from PS header.");
        }
        if !HEADER_END.is_match(&current) {
            if let Some(m) = CASE_3.find(&current) {
                current = current[m.start()..].to_vec();
                fixed = true;
                messages.push("Removed extraneous characters before PS header.");
            }
        }
        if HEADER_END.is_match(&current) {
            if line_no > 0 {
                messages.push("Removed extraneous lines in front of PS header.");
            }
            header = current;
            header_index = Some(line_no);
            break;
        }
        if line_no > 10 {
            break;
        }
    }

    if !fixed {
        return Ok(String::new());
    }

    let mut out = Vec::with_capacity(bytes.len());
    match header_index {
        Some(idx) => {
            out.extend_from_slice(&header);
            for line in &all_lines[idx + 1..] {
                out.extend_from_slice(line);
            }
        }
        None => {
            // No recognizable header in the leading lines; insert a
            // start indicator above the original content.
            header = b"%!\n".to_vec();
            out.extend_from_slice(&header);
            out.extend_from_slice(&bytes);
        }
    }
    workspace.write_file(path, &out)?;

    // Re-identify; a successful repair shows up as a type change.
    let new_type = infer::infer_file_type(workspace, path)?;
    workspace.set_file_type(path, new_type)?;
    let name = relpath::basename(path).to_string();
    let message = messages.join(" ");
    let text = if orig_type != new_type && new_type == FileType::Postscript {
        format!("Repaired Postscript file '{}': {}", name, message)
    } else {
        format!("Attempted repairs on Postscript file '{}': {}", name, message)
    };
    workspace.add_warning(path, POSTSCRIPT_REPAIRED, text);

    let header_str = String::from_utf8_lossy(&header);
    Ok(header_str.trim_end().chars().take(75).collect())
}

/// Repairs DOS EPS files by stripping TIFF screen previews.
///
/// DOS EPS header layout:
///
/// ```text
/// 0-3   magic C5 D0 D3 C6
/// 4-7   byte position of the PostScript section
/// 8-11  byte length of the PostScript section
/// 12-15 byte position of the Metafile representation
/// 16-19 byte length of the Metafile section
/// 20-23 byte position of the TIFF representation
/// 24-27 byte length of the TIFF section
/// ```
#[derive(Debug, Default)]
pub struct RepairDOSEPSFiles;

impl Checker for RepairDOSEPSFiles {
    fn name(&self) -> &'static str {
        "RepairDOSEPSFiles"
    }

    fn check_typed(
        &self,
        workspace: &mut Workspace,
        path: &str,
        file_type: FileType,
    ) -> Result<()> {
        if file_type != FileType::DosEps {
            return Ok(());
        }
        repair_dos_eps(workspace, path)
    }
}

fn read_i32_le(bytes: &[u8], at: usize) -> i64 {
    i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]) as i64
}

fn repair_dos_eps(workspace: &mut Workspace, path: &str) -> Result<()> {
    let bytes = workspace.read_file(path)?;
    if bytes.len() < 28 || bytes[0..4] != [0xC5, 0xD0, 0xD3, 0xC6] {
        // Stale type; re-identify and move on.
        let new_type = infer::infer_file_type(workspace, path)?;
        workspace.set_file_type(path, new_type)?;
        return Ok(());
    }

    let psoffset = read_i32_le(&bytes, 4);
    let pslength = read_i32_le(&bytes, 8);
    let tiffoffset = read_i32_le(&bytes, 20);
    let tifflength = read_i32_le(&bytes, 24);

    if psoffset <= 0 || pslength <= 0 || tiffoffset <= 0 || tifflength <= 0 {
        // No embedded TIFF to strip; fall back to header repair.
        workspace.add_warning(path, TIFF_STRIP_FAILED, "Failed to strip TIFF preview");
        repair_postscript(workspace, path)?;
        return Ok(());
    }

    let ps_start = psoffset as usize;
    if ps_start >= bytes.len() {
        workspace.add_warning(path, TIFF_STRIP_FAILED, "Failed to strip TIFF preview");
        return Ok(());
    }

    let name = relpath::basename(path).to_string();
    if psoffset > tiffoffset {
        // PostScript follows the TIFF: drop the header and the bitmap by
        // keeping everything from the PostScript offset on.
        let section = &bytes[ps_start..];
        if !PS_SECTION.is_match(first_line(section)) {
            workspace.log_info(&format!(
                "{}: Couldn't find beginning of Postscript section",
                path
            ));
            return Ok(());
        }
        workspace.write_file(path, section)?;
        let new_type = infer::infer_file_type(workspace, path)?;
        workspace.set_file_type(path, new_type)?;
        debug!(path, stripped = ps_start, "stripped leading TIFF from DOS EPS");
        workspace.add_warning(path, LEADING_TIFF_STRIPPED, "Leading TIFF preview stripped");
    } else {
        // TIFF follows the PostScript: keep the original bytes aside in
        // the removed area, then truncate.
        let tiff_start = (tiffoffset as usize).min(bytes.len());
        let section = &bytes[ps_start..tiff_start];
        if !PS_SECTION.is_match(first_line(section)) {
            workspace.log_info(&format!(
                "{}: Couldn't find beginning of Postscript section",
                path
            ));
            return Ok(());
        }
        let backup_name = format!("{}.original", relpath::flatten(path));
        workspace.storage().write_all(
            workspace.upload_id(),
            &backup_name,
            &PathContext::removed(),
            &bytes,
        )?;
        workspace.log_info(&format!(
            "Saved original of '{}' as '{}' before stripping trailing TIFF.",
            name, backup_name
        ));
        workspace.write_file(path, section)?;
        let new_type = infer::infer_file_type(workspace, path)?;
        workspace.set_file_type(path, new_type)?;
        workspace.add_warning(
            path,
            TRAILING_TIFF_STRIPPED,
            "Trailing TIFF preview stripped",
        );
    }
    Ok(())
}

fn first_line(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == b'\n') {
        Some(i) => &bytes[..=i],
        None => bytes,
    }
}
