//! Safely expand archives deposited into the workspace
//!
//! Tar (plain, gzipped, bzip2-compressed) and zip archives are expanded
//! in place: each member lands next to the archive that carried it. Every
//! member destination is vetted with the workspace's safety check before
//! a single byte is written; a member that tries to climb out of the
//! source tree is skipped with nothing but a log entry. Links and device
//! nodes are refused with a warning. After expansion the archive itself
//! is moved to the removed area, and the next check pass picks up
//! whatever was extracted, including nested archives.

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use sourcemill_core::{path as relpath, Error, FileType, Result};
use sourcemill_workspace::{Checker, CreateOptions, Workspace};
use std::fs::File;
use std::io::Read;
use tracing::{debug, warn};

/// Code for archives that fail to expand.
pub const UNPACK_ERROR: &str = "unpack_error";
/// Code for refused member classes (links, devices).
pub const DISALLOWED_FILES: &str = "contains_disallowed_files";
/// Code for files that carry an archive type but no readable archive.
pub const UNREADABLE_TAR: &str = "tar_file_unreadable";

fn unpack_error_message(name: &str, error: &str) -> String {
    format!(
        "There were problems unpacking '{}'. Please try again and confirm your files. Error: {}",
        name, error
    )
}

/// What one archive member turned out to be.
struct Member {
    name: String,
    kind: MemberKind,
}

enum MemberKind {
    File(Vec<u8>),
    Directory,
    Refused(&'static str),
}

/// Unpacks tar-family archives (plain, gzip, bzip2).
#[derive(Debug, Default)]
pub struct UnpackCompressedTarFiles;

impl Checker for UnpackCompressedTarFiles {
    fn name(&self) -> &'static str {
        "UnpackCompressedTarFiles"
    }

    fn check_typed(
        &self,
        workspace: &mut Workspace,
        path: &str,
        file_type: FileType,
    ) -> Result<()> {
        if !file_type.is_tar_family() {
            return Ok(());
        }
        if !workspace.is_tarfile(path) {
            let name = relpath::basename(path).to_string();
            workspace.add_error(
                path,
                UNREADABLE_TAR,
                format!("Unable to read tar '{}': not a tar file", name),
            );
            return Ok(());
        }
        unpack_archive(workspace, path, file_type)
    }
}

/// Unpacks zip archives.
#[derive(Debug, Default)]
pub struct UnpackCompressedZIPFiles;

impl Checker for UnpackCompressedZIPFiles {
    fn name(&self) -> &'static str {
        "UnpackCompressedZIPFiles"
    }

    fn check_typed(
        &self,
        workspace: &mut Workspace,
        path: &str,
        file_type: FileType,
    ) -> Result<()> {
        if file_type != FileType::Zip {
            return Ok(());
        }
        unpack_archive(workspace, path, file_type)
    }
}

fn unpack_archive(workspace: &mut Workspace, path: &str, file_type: FileType) -> Result<()> {
    let archive_dir = relpath::parent(path).to_string();
    let archive_name = relpath::basename(path).to_string();
    workspace.log_info(&format!(
        "***** unpack {} {} to dir: {}",
        file_type, path, archive_dir
    ));

    let members = match read_members(workspace, path, file_type) {
        Ok(members) => members,
        Err(e) => {
            // Archive-level fault: one warning, whatever was read stays,
            // and the broken archive is moved aside.
            warn!(path, error = %e, "archive failed to expand");
            workspace.add_warning(
                path,
                UNPACK_ERROR,
                unpack_error_message(&archive_name, &e.to_string()),
            );
            workspace.remove(path, &format!("Removed packed file '{}'.", archive_name))?;
            return Ok(());
        }
    };

    let outer = workspace.file(path)?;
    let is_ancillary = outer.is_ancillary;
    let is_persisted = outer.is_persisted;

    for member in members {
        place_member(workspace, path, &archive_dir, is_ancillary, is_persisted, member)?;
    }

    workspace.remove(path, &format!("Removed packed file '{}'.", archive_name))?;
    workspace.log_info(&format!("Removed packed file {}", archive_name));
    Ok(())
}

/// Read every member up front so archive-level errors surface before any
/// destination is touched.
fn read_members(workspace: &Workspace, path: &str, file_type: FileType) -> Result<Vec<Member>> {
    let file = workspace.open_file(path)?;
    match file_type {
        FileType::Tar => read_tar_members(tar::Archive::new(file)),
        FileType::Gzipped => read_tar_members(tar::Archive::new(GzDecoder::new(file))),
        FileType::Bzip2 => read_tar_members(tar::Archive::new(BzDecoder::new(file))),
        FileType::Zip => read_zip_members(file),
        _ => Ok(Vec::new()),
    }
}

fn read_tar_members<R: Read>(mut archive: tar::Archive<R>) -> Result<Vec<Member>> {
    let mut members = Vec::new();
    let entries = archive
        .entries()
        .map_err(|e| Error::serialization(format!("bad tar stream: {}", e)))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| Error::serialization(format!("bad tar entry: {}", e)))?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let kind = match entry.header().entry_type() {
            tar::EntryType::Regular | tar::EntryType::Continuous | tar::EntryType::GNUSparse => {
                let mut bytes = Vec::new();
                entry
                    .read_to_end(&mut bytes)
                    .map_err(|e| Error::serialization(format!("bad tar entry: {}", e)))?;
                MemberKind::File(bytes)
            }
            tar::EntryType::Directory => MemberKind::Directory,
            tar::EntryType::Symlink => MemberKind::Refused("Symbolic links"),
            tar::EntryType::Link => MemberKind::Refused("Hard links"),
            tar::EntryType::Char => MemberKind::Refused("Character devices"),
            tar::EntryType::Block => MemberKind::Refused("Block devices"),
            tar::EntryType::Fifo => MemberKind::Refused("FIFO devices"),
            _ => MemberKind::Refused("Special files"),
        };
        members.push(Member { name, kind });
    }
    Ok(members)
}

fn read_zip_members(file: File) -> Result<Vec<Member>> {
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::serialization(format!("bad zip stream: {}", e)))?;
    let mut members = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::serialization(format!("bad zip entry: {}", e)))?;
        let name = entry.name().to_string();
        let kind = if entry.is_dir() {
            MemberKind::Directory
        } else {
            let mut bytes = Vec::new();
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| Error::serialization(format!("bad zip entry: {}", e)))?;
            MemberKind::File(bytes)
        };
        members.push(Member { name, kind });
    }
    Ok(members)
}

fn place_member(
    workspace: &mut Workspace,
    archive_path: &str,
    archive_dir: &str,
    is_ancillary: bool,
    is_persisted: bool,
    member: Member,
) -> Result<()> {
    let name = relpath::strip_dot_prefix(&member.name);
    let name = name.trim_start_matches('/');
    if name.is_empty() {
        return Ok(());
    }
    let dest = relpath::join(archive_dir, name);

    // Archives may carry relative paths; nothing gets written before the
    // destination is proven to stay inside the workspace.
    if !workspace.is_safe_for(&dest, is_ancillary, is_persisted) {
        debug!(archive = archive_path, member = %member.name, "member tried to escape workspace");
        workspace.log_info(&format!(
            "Member of file {} tried to escape workspace.",
            relpath::basename(archive_path)
        ));
        return Ok(());
    }

    match member.kind {
        MemberKind::Refused(class) => {
            workspace.add_warning_non_persistent(
                archive_path,
                DISALLOWED_FILES,
                format!("{} are not allowed. Removing '{}'", class, member.name),
            );
        }
        MemberKind::Directory => {
            let dest = dest.trim_end_matches('/').to_string();
            workspace.create_file(
                &dest,
                &CreateOptions {
                    is_directory: true,
                    is_ancillary: ancillary_hint(is_ancillary),
                    file_type: Some(FileType::Directory),
                    ..Default::default()
                },
            )?;
        }
        MemberKind::File(bytes) => {
            workspace.create_file(
                &dest,
                &CreateOptions {
                    touch: true,
                    is_ancillary: ancillary_hint(is_ancillary),
                    ..Default::default()
                },
            )?;
            workspace.write_file(&dest, &bytes)?;
            // Freshen the parent so staleness checks notice the arrival.
            let ctx = sourcemill_storage::PathContext {
                is_ancillary,
                ..Default::default()
            };
            let _ = workspace
                .storage()
                .touch(workspace.upload_id(), archive_dir, &ctx);
        }
    }
    Ok(())
}

/// An ancillary archive forces its children ancillary; otherwise the
/// workspace infers from the destination path.
fn ancillary_hint(outer_is_ancillary: bool) -> Option<bool> {
    if outer_is_ancillary {
        Some(true)
    } else {
        None
    }
}
