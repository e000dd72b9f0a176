//! Magic-byte probes over the first kilobyte

use once_cell::sync::Lazy;
use regex::bytes::Regex as BytesRegex;
use regex::Regex;
use sourcemill_core::FileType;

static TIFF_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.tif$").expect("static pattern"));
static JAR_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.jar$").expect("static pattern"));
static ODT_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.odt$").expect("static pattern"));
static DOCX_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.docx$").expect("static pattern"));
static XLSX_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.xlsx$").expect("static pattern"));

static PDF: Lazy<BytesRegex> = Lazy::new(|| BytesRegex::new(r"%PDF-").expect("static pattern"));
static MAC: Lazy<BytesRegex> = Lazy::new(|| {
    BytesRegex::new(r"#!/bin/csh -f\r#|(\r|^)begin \d{1,4}\s+\S.*\r[^\n]").expect("static pattern")
});

/// First matching content probe over the first kilobyte; `None` falls
/// through to deep inspection.
pub fn check_magic(path: &str, head: &[u8]) -> Option<FileType> {
    if head.len() >= 2 && head[0] == 0x1F && head[1] == 0x9D {
        return Some(FileType::Compressed);
    }
    if head.len() >= 2 && head[0] == 0x1F && head[1] == 0x8B {
        return Some(FileType::Gzipped);
    }
    if head.len() >= 4 && &head[0..3] == b"BZh" && head[3] > 0x2F {
        return Some(FileType::Bzip2);
    }
    // POSIX tar: 'ustar' at offset 257.
    if head.len() >= 262 && &head[257..262] == b"ustar" {
        return Some(FileType::Tar);
    }
    if head.len() >= 2 && head[0] == 0xF7 && head[1] == 0x02 {
        return Some(FileType::Dvi);
    }
    if head.len() >= 4 && &head[0..4] == b"GIF8" {
        return Some(FileType::Image);
    }
    if head.len() >= 8 && &head[0..8] == b"\x89PNG\r\n\x1a\n" {
        return Some(FileType::Image);
    }
    // TIFF magic is only trusted when the name says TIFF.
    if TIFF_FILE.is_match(path)
        && head.len() >= 2
        && ((head[0] == 0x4D && head[1] == 0x4D) || (head[0] == 0x49 && head[1] == 0x49))
    {
        return Some(FileType::Image);
    }
    if head.len() >= 5
        && head[0] == 0xFF
        && head[1] == 0xD8
        && head[2] == 0xFF
        && (head[3] == 0xE0 || head[4] == 0xEE)
    {
        return Some(FileType::Image);
    }
    if head.len() >= 4 && head[0] == 0x00 && head[1] == 0x00 && head[2] == 0x01 && head[3] == 0xB3 {
        return Some(FileType::Anim);
    }
    // Zip container family, disambiguated by extension.
    let zip_magic = (head.len() >= 4 && &head[0..4] == b"PK\x03\x04")
        || (head.len() >= 8 && &head[0..8] == b"PK00PK\x03\x04");
    if zip_magic {
        if JAR_FILE.is_match(path) {
            return Some(FileType::Jar);
        }
        if ODT_FILE.is_match(path) {
            return Some(FileType::Odf);
        }
        if DOCX_FILE.is_match(path) {
            return Some(FileType::Docx);
        }
        if XLSX_FILE.is_match(path) {
            return Some(FileType::Xlsx);
        }
        return Some(FileType::Zip);
    }
    if head.len() >= 4 && &head[0..4] == b"Rar!" {
        return Some(FileType::Rar);
    }
    if head.len() >= 4
        && head[0] == 0xC5
        && head[1] == 0xD0
        && head[2] == 0xD3
        && head[3] == 0xC6
    {
        return Some(FileType::DosEps);
    }
    if PDF.is_match(head) {
        return Some(FileType::Pdf);
    }
    if MAC.is_match(head) {
        return Some(FileType::Mac);
    }
    None
}
