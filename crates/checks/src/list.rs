//! The canonical ordered checker list

use sourcemill_workspace::Checker;

use crate::ancillary::AncillaryFileChecker;
use crate::cleanup::{CleanupPostScript, RepairDOSEPSFiles};
use crate::errata::{
    CheckForBibFile, FixTGZFileName, RemoveAADemoFile, RemoveDOCFiles, RemoveDiagramsPackage,
    RemoveDisallowedFiles, RemoveExtraneousRevTeXFiles, RemoveHyperlinkStyleFiles,
    RemoveMetaFiles, RemoveMissingFontFile, RemoveSyncTeXFiles,
};
use crate::file_extensions::FixFileExtensions;
use crate::file_names::{
    FixWindowsFileNames, PanicOnIllegalCharacters, ReplaceIllegalCharacters,
    ReplaceLeadingHyphen, WarnAboutTeXBackupFiles,
};
use crate::file_type::InferFileType;
use crate::hidden_files::{RemoveFilesWithLeadingDot, RemoveMacOSXHiddenFiles};
use crate::images::CheckForUnacceptableImages;
use crate::invalid_types::{FlagInvalidFileTypes, FlagInvalidSourceTypes};
use crate::processed::WarnAboutProcessedDirectory;
use crate::source_types::InferSourceType;
use crate::tex_format::CheckTeXForm;
use crate::tex_generated::{DisallowDVIFiles, RemoveTeXGeneratedFiles};
use crate::unmacify::UnMacify;
use crate::unpack::{UnpackCompressedTarFiles, UnpackCompressedZIPFiles};
use crate::uuencoded::CheckForUUEncodedFiles;
use crate::zero_length::ZeroLengthFileChecker;

/// The standard checker list, in application order.
///
/// The first three run before anything else because they eliminate files
/// that must not be inspected further. Unpacking comes last so that files
/// discovered mid-pass are never invalidated; the pipeline re-runs after
/// an unpacking pass.
pub fn default_checkers() -> Vec<Box<dyn Checker>> {
    vec![
        Box::new(RemoveMacOSXHiddenFiles),
        Box::new(RemoveFilesWithLeadingDot),
        Box::new(ZeroLengthFileChecker),
        Box::new(WarnAboutProcessedDirectory),
        Box::new(FixWindowsFileNames),
        Box::new(AncillaryFileChecker),
        Box::new(WarnAboutTeXBackupFiles),
        Box::new(ReplaceIllegalCharacters),
        Box::new(ReplaceLeadingHyphen),
        Box::new(RemoveHyperlinkStyleFiles),
        Box::new(RemoveDisallowedFiles),
        Box::new(RemoveMetaFiles),
        Box::new(CheckForBibFile),
        Box::new(RemoveExtraneousRevTeXFiles),
        Box::new(RemoveDiagramsPackage),
        Box::new(RemoveAADemoFile),
        Box::new(RemoveMissingFontFile),
        Box::new(RemoveSyncTeXFiles),
        Box::new(PanicOnIllegalCharacters),
        Box::new(RemoveTeXGeneratedFiles),
        Box::new(FixTGZFileName),
        Box::new(RemoveDOCFiles),
        Box::new(InferFileType),
        Box::new(DisallowDVIFiles),
        Box::new(FixFileExtensions),
        Box::new(UnMacify),
        Box::new(CleanupPostScript),
        Box::new(CheckTeXForm),
        Box::new(CheckForUnacceptableImages),
        Box::new(CheckForUUEncodedFiles),
        Box::new(RepairDOSEPSFiles),
        Box::new(FlagInvalidFileTypes),
        Box::new(InferSourceType),
        Box::new(FlagInvalidSourceTypes),
        Box::new(UnpackCompressedTarFiles),
        Box::new(UnpackCompressedZIPFiles),
    ]
}
