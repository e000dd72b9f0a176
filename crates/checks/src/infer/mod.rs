//! File-type inference
//!
//! Decides the semantic type of a single file from its name and content.
//! Probes run strictly in order and the first match wins:
//!
//! 1. existence and filename-pattern probes (no read)
//! 2. zero-size check
//! 3. magic-byte probes over the first kilobyte
//! 4. deep line-by-line inspection with TeX hint accumulation
//!
//! The result is deterministic for fixed file bytes and never mutates the
//! file.

mod heavy;
mod magic;
mod patterns;

use sourcemill_core::{FileType, Result};
use sourcemill_workspace::Workspace;
use std::io::Read;
use tracing::debug;

/// How much of the file the magic-byte probes inspect.
const MAGIC_WINDOW: usize = 1024;

/// Infer the type of the live file at `path`.
pub fn infer_file_type(workspace: &Workspace, path: &str) -> Result<FileType> {
    let file = workspace.file(path)?;
    if file.is_directory {
        return Ok(FileType::Directory);
    }

    // The backing file must exist before anything else.
    let ctx = file.path_context();
    if !workspace
        .storage()
        .exists(workspace.upload_id(), path, &ctx)
    {
        return Ok(FileType::Failed);
    }

    if let Some(found) = patterns::check_name(path) {
        debug!(path, file_type = %found, "typed by filename pattern");
        return Ok(found);
    }

    if file.size_bytes == 0 {
        return Ok(FileType::Ignore);
    }

    let mut head = vec![0u8; MAGIC_WINDOW];
    let n = {
        let mut f = workspace.open_file(path)?;
        read_up_to(&mut f, &mut head)?
    };
    head.truncate(n);

    if let Some(found) = magic::check_magic(path, &head) {
        debug!(path, file_type = %found, "typed by content magic");
        return Ok(found);
    }

    let found = heavy::scan(workspace, path)?.unwrap_or(FileType::Failed);
    debug!(path, file_type = %found, "typed by deep inspection");
    Ok(found)
}

fn read_up_to(f: &mut std::fs::File, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = f.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{put, workspace};

    fn typed(path: &str, bytes: &[u8]) -> FileType {
        let (_dir, mut ws) = workspace();
        put(&mut ws, path, bytes);
        infer_file_type(&ws, path).unwrap()
    }

    #[test]
    fn test_readme_command_file() {
        assert_eq!(typed("00README.XXX", b"anything"), FileType::Readme);
    }

    #[test]
    fn test_dvihps_temp_files() {
        assert_eq!(typed("head.tmp", b"x"), FileType::AlwaysIgnore);
        assert_eq!(typed("body.tmp", b"x"), FileType::AlwaysIgnore);
        // Only in the file name position, not a mere suffix.
        assert_ne!(typed("abody.tmp", b"x"), FileType::AlwaysIgnore);
    }

    #[test]
    fn test_missfont_aborts() {
        assert_eq!(typed("missfont.log", b"x"), FileType::Abort);
    }

    #[test]
    fn test_aux_tex_extensions() {
        for name in [
            "a.sty", "a.cls", "a.bbl", "a.bst", "a.tfm", "a.600pk", "a.log", "a.toc", "a.clo",
        ] {
            assert_eq!(typed(name, b"content"), FileType::Texaux, "{name}");
        }
    }

    #[test]
    fn test_extension_probes() {
        assert_eq!(typed("paper.abs", b"x"), FileType::Abs);
        assert_eq!(typed("fig.fig", b"x"), FileType::Ignore);
        assert_eq!(typed("notebook.nb", b"x"), FileType::Notebook);
        assert_eq!(typed("run.inp", b"x"), FileType::Input);
        assert_eq!(typed("page.html", b"x"), FileType::Html);
        assert_eq!(typed("page.htm", b"x"), FileType::Html);
        assert_eq!(typed("secret.cry", b"x"), FileType::Encrypted);
    }

    #[test]
    fn test_zero_size_is_ignore() {
        assert_eq!(typed("empty.dat", b""), FileType::Ignore);
    }

    #[test]
    fn test_compressed_magics() {
        assert_eq!(typed("a.dat", &[0x1F, 0x9D, 1, 2]), FileType::Compressed);
        assert_eq!(typed("a.dat", &[0x1F, 0x8B, 8, 0]), FileType::Gzipped);
        assert_eq!(typed("a.dat", b"BZh91AY"), FileType::Bzip2);
        // 'BZh' followed by a low byte is not bzip2.
        assert_ne!(typed("b.dat", &[0x42, 0x5A, 0x68, 0x2F]), FileType::Bzip2);
    }

    #[test]
    fn test_tar_ustar_at_257() {
        let mut bytes = vec![0u8; 512];
        bytes[257..262].copy_from_slice(b"ustar");
        assert_eq!(typed("archive.dat", &bytes), FileType::Tar);
    }

    #[test]
    fn test_image_and_media_magics() {
        assert_eq!(typed("a.dat", &[0xF7, 0x02, 0, 0]), FileType::Dvi);
        assert_eq!(typed("a.dat", b"GIF87a"), FileType::Image);
        assert_eq!(
            typed("a.dat", b"\x89PNG\r\n\x1a\n123"),
            FileType::Image
        );
        assert_eq!(
            typed("a.dat", &[0x00, 0x00, 0x01, 0xB3, 0]),
            FileType::Anim
        );
        assert_eq!(
            typed("a.dat", &[0xFF, 0xD8, 0xFF, 0xE0, 0x00]),
            FileType::Image
        );
        assert_eq!(
            typed("a.dat", &[0xFF, 0xD8, 0xFF, 0x00, 0xEE]),
            FileType::Image
        );
    }

    #[test]
    fn test_tiff_only_with_tif_extension() {
        assert_eq!(typed("scan.tif", b"MM\x00*rest"), FileType::Image);
        assert_eq!(typed("scan.tif", b"II*\x00rest"), FileType::Image);
        assert_ne!(typed("scan.dat", b"MM\x00*rest"), FileType::Image);
    }

    #[test]
    fn test_zip_family_extension_disambiguation() {
        let zip = b"PK\x03\x04rest of stream";
        assert_eq!(typed("archive.zip", zip), FileType::Zip);
        assert_eq!(typed("archive.dat", zip), FileType::Zip);
        assert_eq!(typed("lib.jar", zip), FileType::Jar);
        assert_eq!(typed("doc.odt", zip), FileType::Odf);
        assert_eq!(typed("doc.docx", zip), FileType::Docx);
        assert_eq!(typed("sheet.xlsx", zip), FileType::Xlsx);
        assert_eq!(typed("span.zip", b"PK00PK\x03\x04x"), FileType::Zip);
    }

    #[test]
    fn test_rar_and_dos_eps() {
        assert_eq!(typed("a.rar", b"Rar!\x1a\x07"), FileType::Rar);
        assert_eq!(
            typed("fig.eps", &[0xC5, 0xD0, 0xD3, 0xC6, 0, 0]),
            FileType::DosEps
        );
    }

    #[test]
    fn test_pdf_anywhere_in_first_kilobyte() {
        assert_eq!(typed("doc.dat", b"%PDF-1.4\n..."), FileType::Pdf);
        let mut padded = vec![b' '; 500];
        padded.extend_from_slice(b"%PDF-1.5");
        assert_eq!(typed("doc.dat", &padded), FileType::Pdf);
    }

    #[test]
    fn test_postscript_first_line() {
        assert_eq!(typed("fig.dat", b"%!\nrest"), FileType::Postscript);
        assert_eq!(
            typed("fig.dat", b"%!PS-Adobe-2.0\nrest"),
            FileType::Postscript
        );
        assert_eq!(
            typed("fig.dat", b"\x04%!PS-Adobe-2.0\nrest"),
            FileType::PsPc
        );
    }

    #[test]
    fn test_ps_font() {
        assert_eq!(
            typed("font.dat", b"%!PS-AdobeFont-1.0: CMR10\n"),
            FileType::PsFont
        );
        assert_eq!(
            typed("font.dat", b"%!FontType1 something\n"),
            FileType::PsFont
        );
    }

    #[test]
    fn test_tex_flavors() {
        assert_eq!(
            typed("main.dat", b"\\documentstyle[12pt]{article}\n"),
            FileType::Latex
        );
        assert_eq!(
            typed("main.dat", b"\\documentclass{article}\n\\begin{document}\n"),
            FileType::Latex2e
        );
        assert_eq!(
            typed(
                "main.dat",
                b"\\documentclass{article}\n\\pdfoutput=1\n\\begin{document}\n"
            ),
            FileType::Pdflatex
        );
        assert_eq!(
            typed(
                "main.dat",
                b"\\documentclass{a}\n\\includegraphics{fig.png}\n"
            ),
            FileType::Pdflatex
        );
        assert_eq!(typed("main.dat", b"%&latex209\n"), FileType::Latex);
        assert_eq!(typed("main.dat", b"%&amstex\n"), FileType::TexMac);
        assert_eq!(typed("m.dat", b"\\input texinfo\n"), FileType::Texinfo);
        assert_eq!(
            typed("m.dat", b"\\input amstex\nrest"),
            FileType::TexPriority
        );
        assert_eq!(typed("m.dat", b"\\input harvmac\n"), FileType::TexMac);
        assert_eq!(typed("m.dat", b"\\input phyzzx\n"), FileType::TexMac);
    }

    #[test]
    fn test_plain_tex_hints() {
        assert_eq!(
            typed("m.dat", b"\\def\\x{1}\nsome text\n"),
            FileType::Tex
        );
        assert_eq!(
            typed("m.dat", b"\\magnification=1200\ntext\n\\end\n"),
            FileType::TexPriority
        );
        // \end mid-line only reaches the weaker hint.
        assert_eq!(typed("m.dat", b"text \\end \n"), FileType::TexPriority2);
    }

    #[test]
    fn test_html_and_mime_content() {
        assert_eq!(typed("p.dat", b"<html>\n<body>\n"), FileType::Html);
        assert_eq!(
            typed("p.dat", b"Content-type: text/plain\n"),
            FileType::MultiPartMime
        );
    }

    #[test]
    fn test_auto_markers() {
        assert_eq!(typed("p.dat", b"%auto-ignore\n"), FileType::Ignore);
        assert_eq!(typed("p.dat", b"%auto-include\n"), FileType::Include);
    }

    #[test]
    fn test_bibtex_and_metafont() {
        assert_eq!(
            typed("refs.dat", b"@book{knuth, title={x}}\n"),
            FileType::Bibtex
        );
        assert_eq!(
            typed("font.dat", b"beginchar(\"A\",1,1,1);\n"),
            FileType::Mf
        );
    }

    #[test]
    fn test_uuencoded_and_pc() {
        assert_eq!(
            typed("u.dat", b"begin 644 file.tar\nM...\n"),
            FileType::Uuencoded
        );
        assert_eq!(
            typed("u.dat", b"begin 644 file.tar\r\nM...\r\n"),
            FileType::Pc
        );
        // A TeX hint seen first takes the tex branch.
        assert_eq!(
            typed("u.dat", b"\\def\\x{1}\nbegin 644 file\n"),
            FileType::Tex
        );
    }

    #[test]
    fn test_failed_when_nothing_matches() {
        assert_eq!(typed("mystery.dat", b"just plain text\n"), FileType::Failed);
    }

    #[test]
    fn test_directory_keeps_directory_type() {
        let (_dir, mut ws) = workspace();
        ws.create_file(
            "figs",
            &sourcemill_workspace::CreateOptions {
                is_directory: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(infer_file_type(&ws, "figs").unwrap(), FileType::Directory);
    }
}
