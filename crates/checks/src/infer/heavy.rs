//! Deep line-by-line inspection
//!
//! The last resort of the type pipeline. Scans the file line by line,
//! accumulating three TeX hint flags, and answers on the first decisive
//! pattern. Line windows (first line, first 7, 10, 12, 40 lines) follow
//! the probe table exactly; changing them changes classifications.

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use sourcemill_core::{FileType, Result};
use sourcemill_workspace::Workspace;
use std::io::{BufRead, BufReader};

static AUTO_IGNORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"%auto-ignore").expect("static pattern"));
static TEXINFO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\input texinfo").expect("static pattern"));
static MULTI_PART_MIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(^|\r)Content-type: ").expect("static pattern"));
static PS_FONT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?ms)^(......)?%!(PS-AdobeFont-1\.|FontType1|PS-Adobe-3\.0 Resource-Font)")
        .expect("static pattern")
});
static POSTSCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^%!").expect("static pattern"));
static PS_PC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^%*\x04%!)|(.*%!PS-Adobe)").expect("static pattern"));
static PS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^%!PS").expect("static pattern"));
static LATEX_MACRO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\r?%&([^\s\n]+)").expect("static pattern"));
static HTML: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<html[>\s]").expect("static pattern"));
static INCLUDE: Lazy<Regex> = Lazy::new(|| Regex::new(r"%auto-include").expect("static pattern"));
static PERCENT_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%[^\r]*").expect("static pattern"));
static LATEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|\r)\s*\\documentstyle").expect("static pattern"));
static LATEX2E_PDFLATEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|\r)\s*\\documentclass").expect("static pattern"));
static MAYBE_TEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|\r)\s*\\(font|magnification|input|def|special|baselineskip|begin)")
        .expect("static pattern")
});
static TEX_PRIORITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\input\s+amstex").expect("static pattern"));
static PARTIAL_HINT_1: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|\r)\s*\\(end|bye)(\s|$)").expect("static pattern"));
static PARTIAL_HINT_2: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(end|bye)(\s|$)").expect("static pattern"));
static TEX_MAC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\\input *(harv|lanl)mac)|(\\input\s+phyzzx)").expect("static pattern")
});
static METAFONT: Lazy<Regex> = Lazy::new(|| Regex::new(r"beginchar\(").expect("static pattern"));
static BIBTEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^|\r)@(book|article|inbook|unpublished)\{").expect("static pattern")
});
static BEGIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^begin \d{1,4}\s+\S+\r?$").expect("static pattern"));
static CARRIAGE_RETURN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r$").expect("static pattern"));
static ALWAYS_IGNORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"paper deliberately replaced by what little").expect("static pattern")
});
static INCLUDE_GRAPHICS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[^%]*\\includegraphics[^%]*\.(?:pdf|png|gif|jpg)\s?\}")
        .expect("static pattern")
});
static PDF_OUTPUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^%]*\\pdfoutput\s*=\s*1").expect("static pattern"));

/// Number of leading lines fed to the font-accumulator probe.
const FONT_WINDOW_LINES: usize = 7;

/// Scan the file; `None` means every probe came up empty.
pub fn scan(workspace: &Workspace, path: &str) -> Result<Option<FileType>> {
    let mut reader = BufReader::new(workspace.open_file(path)?);

    let mut maybe_tex = false;
    let mut maybe_tex_priority = false;
    let mut maybe_tex_priority2 = false;

    let mut accum: Vec<u8> = Vec::new();
    let mut line_no = 1usize;
    let mut raw = Vec::new();

    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        let line: &[u8] = if raw.last() == Some(&b'\n') {
            &raw[..raw.len() - 1]
        } else {
            &raw
        };

        if line_no <= 10 && AUTO_IGNORE.is_match(line) {
            return Ok(Some(FileType::Ignore));
        }
        if line_no <= 10 && TEXINFO.is_match(line) {
            return Ok(Some(FileType::Texinfo));
        }
        if line_no <= 40 && MULTI_PART_MIME.is_match(line) {
            return Ok(Some(FileType::MultiPartMime));
        }

        // The font signature may start at the first or seventh byte of
        // the file, possibly crossing an early newline.
        if line_no <= FONT_WINDOW_LINES {
            accum.extend_from_slice(&raw);
            if PS_FONT.is_match(&accum) {
                return Ok(Some(FileType::PsFont));
            }
        }

        if line_no == 1 && POSTSCRIPT.is_match(line) {
            return Ok(Some(FileType::Postscript));
        }
        if (line_no == 1 && PS_PC.is_match(line))
            || (line_no <= 10 && PS.is_match(line) && !maybe_tex)
        {
            return Ok(Some(FileType::PsPc));
        }

        if line_no <= 12 {
            if let Some(caps) = LATEX_MACRO.captures(line) {
                let format = caps.get(1).map(|m| m.as_bytes()).unwrap_or(b"");
                let latex = matches!(format, b"latex209" | b"biglatex" | b"latex" | b"LaTeX");
                return Ok(Some(if latex {
                    FileType::Latex
                } else {
                    FileType::TexMac
                }));
            }
        }
        if line_no <= 10 && HTML.is_match(line) {
            return Ok(Some(FileType::Html));
        }
        if line_no <= 10 && INCLUDE.is_match(line) {
            return Ok(Some(FileType::Include));
        }

        // Everything below looks at the line with %-comments chopped.
        let stripped = PERCENT_COMMENT.replace_all(line, &b""[..]);
        let line = stripped.as_ref();

        if LATEX.is_match(line) {
            return Ok(Some(FileType::Latex));
        }
        if LATEX2E_PDFLATEX.is_match(line) {
            return Ok(Some(latex2e_or_pdflatex(workspace, path, line_no)?));
        }
        if MAYBE_TEX.is_match(line) {
            maybe_tex = true;
            if TEX_PRIORITY.is_match(line) {
                return Ok(Some(FileType::TexPriority));
            }
        }
        if PARTIAL_HINT_1.is_match(line) {
            maybe_tex_priority = true;
        }
        if PARTIAL_HINT_2.is_match(line) {
            maybe_tex_priority2 = true;
        }
        if TEX_MAC.is_match(line) {
            return Ok(Some(FileType::TexMac));
        }
        if METAFONT.is_match(line) {
            return Ok(Some(FileType::Mf));
        }
        if BIBTEX.is_match(line) {
            return Ok(Some(FileType::Bibtex));
        }

        if BEGIN.is_match(line) {
            if maybe_tex_priority {
                return Ok(Some(FileType::TexPriority));
            }
            if maybe_tex {
                return Ok(Some(FileType::Tex));
            }
            if CARRIAGE_RETURN.is_match(line) {
                return Ok(Some(FileType::Pc));
            }
            return Ok(Some(FileType::Uuencoded));
        }
        if ALWAYS_IGNORE.is_match(line) {
            return Ok(Some(FileType::AlwaysIgnore));
        }
        line_no += 1;
    }

    // Last-chance guesses from the accumulated hints.
    if maybe_tex_priority {
        return Ok(Some(FileType::TexPriority));
    }
    if maybe_tex_priority2 {
        return Ok(Some(FileType::TexPriority2));
    }
    if maybe_tex {
        return Ok(Some(FileType::Tex));
    }
    Ok(None)
}

/// Disambiguate LaTeX2e from pdflatex: rescan from the top for graphics
/// inclusions in PDF-only formats, or `\pdfoutput=1` within five lines of
/// the `\documentclass` hit.
fn latex2e_or_pdflatex(workspace: &Workspace, path: &str, count: usize) -> Result<FileType> {
    let limit = count + 5;
    let mut reader = BufReader::new(workspace.open_file(path)?);
    let mut line_no = 1usize;
    let mut raw = Vec::new();
    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        let line: &[u8] = if raw.last() == Some(&b'\n') {
            &raw[..raw.len() - 1]
        } else {
            &raw
        };
        if INCLUDE_GRAPHICS.is_match(line) || (line_no < limit && PDF_OUTPUT.is_match(line)) {
            return Ok(FileType::Pdflatex);
        }
        line_no += 1;
    }
    Ok(FileType::Latex2e)
}
