//! Enumerations for file classification and workspace lifecycle
//!
//! The wire representations (lowercase snake_case) are stable: they are
//! stored by the hosting service and surfaced through its API, so variants
//! must not be renamed or reordered casually.

use serde::{Deserialize, Serialize};

/// Semantic type of a single file in a workspace.
///
/// Assigned by the type inference pass from a combination of filename
/// patterns and content inspection. `Unknown` is the initial state for a
/// freshly deposited file; `Failed` means inference ran and could not
/// determine a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum FileType {
    Unknown,
    Readme,
    AlwaysIgnore,
    Abort,
    Ignore,
    Input,
    Bibtex,
    Postscript,
    DosEps,
    PsFont,
    PsPc,
    Image,
    Anim,
    Html,
    Pdf,
    Dvi,
    Notebook,
    Odf,
    Docx,
    Xlsx,
    Tex,
    Pdftex,
    TexPriority2,
    TexAms,
    TexPriority,
    TexMac,
    Latex,
    Latex2e,
    Pdflatex,
    Texinfo,
    Mf,
    Uuencoded,
    Encrypted,
    Pc,
    Mac,
    Csh,
    Sh,
    Jar,
    Rar,
    Compressed,
    Zip,
    Gzipped,
    Bzip2,
    MultiPartMime,
    Tar,
    Texaux,
    Abs,
    Include,
    Directory,
    Failed,
}

/// TeX-family types, in downstream compilation order of preference.
const TEX_TYPES: &[FileType] = &[
    FileType::Latex,
    FileType::Tex,
    FileType::TexPriority,
    FileType::TexAms,
    FileType::TexMac,
    FileType::Latex2e,
    FileType::TexPriority2,
    FileType::Texinfo,
    FileType::Pdflatex,
    FileType::Pdftex,
];

/// Processing priority order. Position + 1 is the priority; types absent
/// from this table have priority 0.
const TYPE_PRIORITIES: &[FileType] = &[
    FileType::Abort,
    FileType::Failed,
    FileType::AlwaysIgnore,
    FileType::Input,
    FileType::Bibtex,
    FileType::Postscript,
    FileType::DosEps,
    FileType::PsFont,
    FileType::PsPc,
    FileType::Image,
    FileType::Anim,
    FileType::Html,
    FileType::Pdf,
    FileType::Dvi,
    FileType::Notebook,
    FileType::Odf,
    FileType::Docx,
    FileType::Tex,
    FileType::Pdftex,
    FileType::TexPriority2,
    FileType::TexAms,
    FileType::TexPriority,
    FileType::TexMac,
    FileType::Latex,
    FileType::Latex2e,
    FileType::Pdflatex,
    FileType::Texinfo,
    FileType::Mf,
    FileType::Uuencoded,
    FileType::Encrypted,
    FileType::Pc,
    FileType::Mac,
    FileType::Csh,
    FileType::Sh,
    FileType::Jar,
    FileType::Rar,
    FileType::Xlsx,
    FileType::Compressed,
    FileType::Zip,
    FileType::Gzipped,
    FileType::Bzip2,
    FileType::MultiPartMime,
    FileType::Tar,
    FileType::Ignore,
    FileType::Readme,
    FileType::Texaux,
    FileType::Abs,
    FileType::Include,
];

impl FileType {
    /// Wire-stable string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Unknown => "unknown",
            FileType::Readme => "readme",
            FileType::AlwaysIgnore => "always_ignore",
            FileType::Abort => "abort",
            FileType::Ignore => "ignore",
            FileType::Input => "input",
            FileType::Bibtex => "bibtex",
            FileType::Postscript => "postscript",
            FileType::DosEps => "dos_eps",
            FileType::PsFont => "ps_font",
            FileType::PsPc => "ps_pc",
            FileType::Image => "image",
            FileType::Anim => "anim",
            FileType::Html => "html",
            FileType::Pdf => "pdf",
            FileType::Dvi => "dvi",
            FileType::Notebook => "notebook",
            FileType::Odf => "odf",
            FileType::Docx => "docx",
            FileType::Xlsx => "xlsx",
            FileType::Tex => "tex",
            FileType::Pdftex => "pdftex",
            FileType::TexPriority2 => "tex_priority2",
            FileType::TexAms => "tex_ams",
            FileType::TexPriority => "tex_priority",
            FileType::TexMac => "tex_mac",
            FileType::Latex => "latex",
            FileType::Latex2e => "latex2e",
            FileType::Pdflatex => "pdflatex",
            FileType::Texinfo => "texinfo",
            FileType::Mf => "mf",
            FileType::Uuencoded => "uuencoded",
            FileType::Encrypted => "encrypted",
            FileType::Pc => "pc",
            FileType::Mac => "mac",
            FileType::Csh => "csh",
            FileType::Sh => "sh",
            FileType::Jar => "jar",
            FileType::Rar => "rar",
            FileType::Compressed => "compressed",
            FileType::Zip => "zip",
            FileType::Gzipped => "gzipped",
            FileType::Bzip2 => "bzip2",
            FileType::MultiPartMime => "multi_part_mime",
            FileType::Tar => "tar",
            FileType::Texaux => "texaux",
            FileType::Abs => "abs",
            FileType::Include => "include",
            FileType::Directory => "directory",
            FileType::Failed => "failed",
        }
    }

    /// Human-readable display name for listings.
    pub fn display_name(&self) -> &'static str {
        match self {
            FileType::Unknown => "unknown",
            FileType::Readme => "override",
            FileType::AlwaysIgnore => "Always ignore",
            FileType::Abort => "Immediate stop",
            FileType::Ignore => "user defined IGNORE",
            FileType::Input => "Input for (La)TeX",
            FileType::Bibtex => "BiBTeX",
            FileType::Postscript => "Postscript",
            FileType::DosEps => "DOS EPS Binary File",
            FileType::PsFont => "Postscript Type 1 Font",
            FileType::PsPc => "^D%! Postscript",
            FileType::Image => "Image (gif/jpg etc)",
            FileType::Anim => "Animation (mpeg etc)",
            FileType::Html => "HTML",
            FileType::Pdf => "PDF",
            FileType::Dvi => "DVI",
            FileType::Notebook => "Mathematica Notebook",
            FileType::Odf => "OpenDocument Format",
            FileType::Docx => "Microsoft DOCX",
            FileType::Xlsx => "Microsoft XLSX",
            FileType::Tex => "TEX",
            FileType::Pdftex => "PDFTEX",
            FileType::TexPriority2 => "TeX (with \\end or \\bye - not starting a line)",
            FileType::TexAms => "AMSTeX",
            FileType::TexPriority => "TeX (with \\end or \\bye)",
            FileType::TexMac => "TeX +macros (harv,lanl..)",
            FileType::Latex => "LaTeX",
            FileType::Latex2e => "LATEX2e",
            FileType::Pdflatex => "PDFLATEX",
            FileType::Texinfo => "Texinfo",
            FileType::Mf => "Metafont",
            FileType::Uuencoded => "UUencoded",
            FileType::Encrypted => "Encrypted",
            FileType::Pc => "PC-ctrl-Ms",
            FileType::Mac => "MAC-ctrl-Ms",
            FileType::Csh => "CSH",
            FileType::Sh => "SH",
            FileType::Jar => "JAR archive",
            FileType::Rar => "RAR archive",
            FileType::Compressed => "UNIX-compressed",
            FileType::Zip => "ZIP-compressed",
            FileType::Gzipped => "GZIP-compressed",
            FileType::Bzip2 => "BZIP2-compressed",
            FileType::MultiPartMime => "MULTI_PART_MIME",
            FileType::Tar => "TAR archive",
            FileType::Texaux => "TeX auxiliary",
            FileType::Abs => "abstract",
            FileType::Include => "keep",
            FileType::Directory => "Directory",
            FileType::Failed => "unknown",
        }
    }

    /// Processing priority. Higher values are handled earlier by downstream
    /// compilation; 0 means the type does not participate in ordering.
    pub fn priority(&self) -> usize {
        TYPE_PRIORITIES
            .iter()
            .position(|t| t == self)
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// True for any member of the TeX family.
    pub fn is_tex(&self) -> bool {
        TEX_TYPES.contains(self)
    }

    /// True for archives the unpack checkers expand.
    pub fn is_archive(&self) -> bool {
        matches!(
            self,
            FileType::Tar | FileType::Gzipped | FileType::Bzip2 | FileType::Zip
        )
    }

    /// True for the tar family (plain, gzipped, or bzip2-compressed).
    pub fn is_tar_family(&self) -> bool {
        matches!(self, FileType::Tar | FileType::Gzipped | FileType::Bzip2)
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate classification of a workspace's live contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum SourceType {
    Unknown,
    Tex,
    Pdf,
    Postscript,
    Html,
    Invalid,
}

impl SourceType {
    /// Wire-stable string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Unknown => "unknown",
            SourceType::Tex => "tex",
            SourceType::Pdf => "pdf",
            SourceType::Postscript => "postscript",
            SourceType::Html => "html",
            SourceType::Invalid => "invalid",
        }
    }

    /// Check whether classification has not happened yet.
    pub fn is_unknown(&self) -> bool {
        matches!(self, SourceType::Unknown)
    }

    /// Check whether the workspace cannot be submitted as-is.
    pub fn is_invalid(&self) -> bool {
        matches!(self, SourceType::Invalid)
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Activity status of a workspace.
///
/// - Active: in normal use, mutations permitted
/// - Released: the owner has handed the workspace off; read-only
/// - Deleted: destroyed on disk; terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Status {
    Active,
    Released,
    Deleted,
}

impl Status {
    /// Wire-stable string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Released => "released",
            Status::Deleted => "deleted",
        }
    }

    /// Check whether the workspace is in normal use.
    pub fn is_active(&self) -> bool {
        matches!(self, Status::Active)
    }

    /// Check whether the workspace has been destroyed.
    pub fn is_deleted(&self) -> bool {
        matches!(self, Status::Deleted)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lock state of a workspace. Locked workspaces refuse all mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum LockState {
    Locked,
    Unlocked,
}

impl LockState {
    /// Wire-stable string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LockState::Locked => "locked",
            LockState::Unlocked => "unlocked",
        }
    }

    /// Check whether the workspace is locked.
    pub fn is_locked(&self) -> bool {
        matches!(self, LockState::Locked)
    }
}

impl std::fmt::Display for LockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate gate status derived from a workspace's diagnostics.
///
/// `Errors` blocks downstream processing; `ReadyWithWarnings` lets the
/// client continue after review; `Ready` is clean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Readiness {
    Ready,
    ReadyWithWarnings,
    Errors,
}

impl Readiness {
    /// Wire-stable string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Readiness::Ready => "ready",
            Readiness::ReadyWithWarnings => "ready_with_warnings",
            Readiness::Errors => "errors",
        }
    }
}

impl std::fmt::Display for Readiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
