//! Filename-pattern probes
//!
//! These identify a type from the path alone, without reading content.
//! They run before every content probe; order matters.

use once_cell::sync::Lazy;
use regex::Regex;
use sourcemill_core::FileType;

static ARXIV_COMMAND_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|/)00README\.XXX$").expect("static pattern"));
static DVIPS_TEMP_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|/)(head|body)\.tmp$").expect("static pattern"));
static MISSFONT_LOG_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|/)missfont\.log$").expect("static pattern"));
static AUX_TEX_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\.(sty|cls|mf|\d*pk|bbl|bst|tfm|ax|def|log|hrfldf|cfg|clo|inx|end|fgx|tbx|rtx|rty|toc)$",
    )
    .expect("static pattern")
});
static ABS_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.abs$").expect("static pattern"));
static XFIG_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.fig$").expect("static pattern"));
static NOTEBOOK_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.nb$").expect("static pattern"));
static INPUT_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.inp$").expect("static pattern"));
static HTML_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.html?$").expect("static pattern"));
static ENCRYPTED_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.cry$").expect("static pattern"));

/// First matching filename probe, in priority order.
pub fn check_name(path: &str) -> Option<FileType> {
    if ARXIV_COMMAND_FILE.is_match(path) {
        return Some(FileType::Readme);
    }
    if DVIPS_TEMP_FILE.is_match(path) {
        return Some(FileType::AlwaysIgnore);
    }
    if MISSFONT_LOG_FILE.is_match(path) {
        return Some(FileType::Abort);
    }
    if AUX_TEX_FILE.is_match(path) {
        return Some(FileType::Texaux);
    }
    if ABS_FILE.is_match(path) {
        return Some(FileType::Abs);
    }
    if XFIG_FILE.is_match(path) {
        return Some(FileType::Ignore);
    }
    if NOTEBOOK_FILE.is_match(path) {
        return Some(FileType::Notebook);
    }
    if INPUT_FILE.is_match(path) {
        return Some(FileType::Input);
    }
    if HTML_FILE.is_match(path) {
        return Some(FileType::Html);
    }
    if ENCRYPTED_FILE.is_match(path) {
        return Some(FileType::Encrypted);
    }
    None
}
