//! Checks related to images and graphics

use once_cell::sync::Lazy;
use regex::Regex;
use sourcemill_core::{FileType, Result};
use sourcemill_workspace::{Checker, Workspace};

/// Code for image formats that are not accepted.
pub const UNSUPPORTED_IMAGE: &str = "unsupported_image";

static UNACCEPTABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(pcx|bmp|wmf|opj|pct|tiff?)$").expect("static pattern"));

/// Warns about graphics formats most readers cannot view or print.
#[derive(Debug, Default)]
pub struct CheckForUnacceptableImages;

impl Checker for CheckForUnacceptableImages {
    fn name(&self) -> &'static str {
        "CheckForUnacceptableImages"
    }

    fn check_typed(
        &self,
        workspace: &mut Workspace,
        path: &str,
        file_type: FileType,
    ) -> Result<()> {
        if file_type != FileType::Image {
            return Ok(());
        }
        let name = workspace.file(path)?.name().to_string();
        if let Some(caps) = UNACCEPTABLE.captures(&name) {
            let format = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            workspace.add_warning(
                path,
                UNSUPPORTED_IMAGE,
                format!(
                    "{} is not a supported graphics format: most readers do not have the \
                     programs needed to view and print .{} figures. Please save your {} \
                     figures instead as PostScript, PNG, JPEG, or GIF (PNG/JPEG/GIF files can \
                     be viewed and printed with any graphical web browser).",
                    name, format, format
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
    fn test_unacceptable_formats_warned() {
        let (_dir, mut ws) = workspace();
        for name in ["scan.bmp", "plot.pcx", "chart.wmf", "photo.tiff", "photo.tif"] {
            put(&mut ws, name, b"image bytes");
            CheckForUnacceptableImages
                .check_typed(&mut ws, name, FileType::Image)
                .unwrap();
            assert!(
                ws.diagnostics().get(UNSUPPORTED_IMAGE, name).is_some(),
                "{name}"
            );
        }
    }

    #[test]
    fn test_supported_formats_pass() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "fig.png", b"\x89PNG");
        CheckForUnacceptableImages
            .check_typed(&mut ws, "fig.png", FileType::Image)
            .unwrap();
        assert!(ws.diagnostics().is_empty());
    }

    #[test]
    fn test_non_image_types_skipped() {
        let (_dir, mut ws) = workspace();
        put(&mut ws, "odd.bmp", b"actually tex");
        CheckForUnacceptableImages
            .check_typed(&mut ws, "odd.bmp", FileType::Tex)
            .unwrap();
        assert!(ws.diagnostics().is_empty());
    }
}
