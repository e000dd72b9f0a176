//! Source package builder
//!
//! The source package is the gzipped tar of everything under the source
//! area (ancillary included), rooted at the filesystem separator. It is
//! derived state: rebuilt lazily when any source file is newer than the
//! existing tarball, and characterized by a URL-safe base64 MD5 checksum.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use md5::{Digest, Md5};
use sourcemill_core::{Error, Result};
use sourcemill_storage::StorageAdapter;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tar::{Builder, EntryType, Header};
use tracing::debug;

/// The derived tarball of a workspace's source area.
#[derive(Debug, Clone)]
pub struct SourcePackage {
    storage: Arc<dyn StorageAdapter>,
    upload_id: u64,
}

impl SourcePackage {
    /// Bind to the package of `upload_id`.
    pub fn new(storage: Arc<dyn StorageAdapter>, upload_id: u64) -> Self {
        SourcePackage { storage, upload_id }
    }

    /// Absolute path of the tarball; the file may not exist yet.
    pub fn path(&self) -> PathBuf {
        self.storage
            .workspace_paths(self.upload_id)
            .content_package()
    }

    fn source_dir(&self) -> PathBuf {
        self.storage.workspace_paths(self.upload_id).source_dir()
    }

    /// Whether the tarball currently exists.
    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// When the tarball was written. Errors when it does not exist.
    pub fn modified(&self) -> Result<DateTime<Utc>> {
        let meta = fs::metadata(self.path())?;
        Ok(DateTime::<Utc>::from(meta.modified()?))
    }

    /// Whether the tarball is missing or older than any source file.
    pub fn stale(&self) -> bool {
        let path = self.path();
        let package_mtime = match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(_) => return true,
        };
        match latest_source_mtime(&self.source_dir()) {
            Some(latest) => latest > package_mtime,
            None => true,
        }
    }

    /// Whether the source area holds at least one regular file.
    pub fn has_content(&self) -> bool {
        let src = self.source_dir();
        walkdir::WalkDir::new(&src)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .any(|e| e.file_type().is_file())
    }

    /// Delete any existing tarball.
    pub fn remove(&self) -> Result<()> {
        let path = self.path();
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Build the tarball from the current source area contents.
    ///
    /// Fails with `no_content_to_pack` when the source area is empty, and
    /// leaves no file behind in that case. Members are added in sorted
    /// order so the output is reproducible for a fixed file set.
    pub fn pack(&self) -> Result<PathBuf> {
        if !self.has_content() {
            return Err(Error::NoContentToPack);
        }
        self.remove()?;
        let dest = self.path();
        debug!(upload_id = self.upload_id, path = %dest.display(), "packing source area");

        let file = File::create(&dest)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = Builder::new(encoder);

        let src = self.source_dir();
        let walker = walkdir::WalkDir::new(&src)
            .follow_links(false)
            .sort_by_file_name();
        for entry in walker {
            let entry =
                entry.map_err(|e| Error::storage(format!("walk source area: {}", e)))?;
            if entry.path() == src {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&src)
                .map_err(|e| Error::storage(format!("relativize member: {}", e)))?
                .to_string_lossy()
                .replace('\\', "/");
            append_rooted(&mut builder, &rel, entry.path(), entry.file_type().is_dir())?;
        }

        let encoder = builder
            .into_inner()
            .map_err(|e| Error::storage(format!("finish tar: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| Error::storage(format!("finish gzip: {}", e)))?;
        Ok(dest)
    }

    /// Size of the tarball in bytes, rebuilding when stale. An empty
    /// source area reports 0.
    pub fn size_bytes(&self) -> Result<u64> {
        if !self.exists() || self.stale() {
            match self.pack() {
                Ok(_) => {}
                Err(Error::NoContentToPack) => return Ok(0),
                Err(e) => return Err(e),
            }
        }
        Ok(fs::metadata(self.path())?.len())
    }

    /// URL-safe base64 MD5 of the tarball, rebuilding when stale. `None`
    /// when the workspace has no content.
    pub fn checksum(&self) -> Result<Option<String>> {
        if !self.has_content() {
            return Ok(None);
        }
        if !self.exists() || self.stale() {
            self.pack()?;
        }
        let mut hasher = Md5::new();
        let mut f = File::open(self.path())?;
        let mut chunk = [0u8; 4096];
        loop {
            let n = f.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            hasher.update(&chunk[..n]);
        }
        Ok(Some(URL_SAFE.encode(hasher.finalize())))
    }

    /// Checksum of the tarball as it currently exists on disk, without
    /// rebuilding. `None` when no tarball is present.
    pub fn checksum_existing(&self) -> Result<Option<String>> {
        if !self.exists() {
            return Ok(None);
        }
        let mut hasher = Md5::new();
        let mut f = File::open(self.path())?;
        let mut chunk = [0u8; 4096];
        loop {
            let n = f.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            hasher.update(&chunk[..n]);
        }
        Ok(Some(URL_SAFE.encode(hasher.finalize())))
    }

    /// Open the tarball for reading, rebuilding when stale.
    pub fn open(&self) -> Result<File> {
        if !self.has_content() {
            return Err(Error::NoContentToPack);
        }
        if !self.exists() || self.stale() {
            self.pack()?;
        }
        Ok(File::open(self.path())?)
    }
}

/// Most recent mtime of anything under the source area.
fn latest_source_mtime(src: &Path) -> Option<std::time::SystemTime> {
    let mut latest = None;
    for entry in walkdir::WalkDir::new(src).follow_links(false) {
        let entry = entry.ok()?;
        let mtime = entry.metadata().ok()?.modified().ok()?;
        latest = Some(match latest {
            Some(prev) if prev >= mtime => prev,
            _ => mtime,
        });
    }
    latest
}

/// Append one member with a rooted name (leading separator). Names that
/// do not fit the header's name field are carried in a GNU long-name
/// entry so deep paths stay rooted like their siblings.
fn append_rooted<W: Write>(
    builder: &mut Builder<W>,
    rel: &str,
    full: &Path,
    is_dir: bool,
) -> Result<()> {
    let meta = fs::metadata(full)?;
    let rooted = format!("/{}", rel.trim_end_matches('/'));
    let name_bytes = rooted.as_bytes();

    if name_bytes.len() >= 100 {
        let mut long = Header::new_gnu();
        if let Some(gnu) = long.as_gnu_mut() {
            let link = b"././@LongLink";
            gnu.name = [0u8; 100];
            gnu.name[..link.len()].copy_from_slice(link);
        }
        long.set_mode(0o644);
        long.set_uid(0);
        long.set_gid(0);
        long.set_mtime(0);
        long.set_entry_type(EntryType::GNULongName);
        // Plus one for the terminating NUL, per GNU tar.
        long.set_size(name_bytes.len() as u64 + 1);
        long.set_cksum();
        builder
            .append(&long, name_bytes)
            .map_err(|e| Error::storage(format!("append long name {}: {}", rel, e)))?;
    }

    let mut header = Header::new_gnu();
    header.set_metadata(&meta);
    if is_dir {
        header.set_entry_type(EntryType::dir());
        header.set_size(0);
    }
    if let Some(gnu) = header.as_gnu_mut() {
        let kept = name_bytes.len().min(99);
        gnu.name = [0u8; 100];
        gnu.name[..kept].copy_from_slice(&name_bytes[..kept]);
    }
    header.set_cksum();
    if is_dir {
        builder
            .append(&header, std::io::empty())
            .map_err(|e| Error::storage(format!("append member {}: {}", rel, e)))?;
    } else {
        let f = File::open(full)?;
        builder
            .append(&header, f)
            .map_err(|e| Error::storage(format!("append member {}: {}", rel, e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use sourcemill_storage::{PathContext, SimpleStorage};
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, Arc<dyn StorageAdapter>, SourcePackage) {
        let dir = tempdir().unwrap();
        let storage: Arc<dyn StorageAdapter> = Arc::new(SimpleStorage::new(dir.path()));
        let package = SourcePackage::new(storage.clone(), 21);
        (dir, storage, package)
    }

    fn member_names(path: &Path) -> Vec<String> {
        let data = fs::read(path).unwrap();
        let mut tar_bytes = Vec::new();
        GzDecoder::new(&data[..]).read_to_end(&mut tar_bytes).unwrap();
        let mut archive = tar::Archive::new(&tar_bytes[..]);
        archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path_bytes().iter().map(|b| *b as char).collect())
            .collect()
    }

    #[test]
    fn test_pack_empty_fails_and_leaves_nothing() {
        let (_dir, _storage, package) = setup();
        let err = package.pack().unwrap_err();
        assert_eq!(err.code(), "no_content_to_pack");
        assert!(!package.exists());
        assert_eq!(package.size_bytes().unwrap(), 0);
        assert!(package.checksum().unwrap().is_none());
    }

    #[test]
    fn test_pack_includes_source_and_ancillary_rooted() {
        let (_dir, storage, package) = setup();
        let ctx = PathContext::source();
        storage.write_all(21, "main.tex", &ctx, b"hello").unwrap();
        storage
            .write_all(21, "anc/extra.dat", &ctx, b"data")
            .unwrap();
        let path = package.pack().unwrap();
        let names = member_names(&path);
        assert!(names.contains(&"/main.tex".to_string()), "{names:?}");
        assert!(names.contains(&"/anc/extra.dat".to_string()), "{names:?}");
    }

    #[test]
    fn test_long_member_names_stay_rooted() {
        let (_dir, storage, package) = setup();
        let ctx = PathContext::source();
        let deep = format!("figs/{}/{}/plot.pdf", "a".repeat(48), "b".repeat(48));
        assert!(deep.len() + 1 > 100);
        storage.write_all(21, &deep, &ctx, b"%PDF").unwrap();
        storage.write_all(21, "main.tex", &ctx, b"x").unwrap();

        let path = package.pack().unwrap();
        let names = member_names(&path);
        let rooted = format!("/{}", deep);
        assert!(names.contains(&rooted), "{names:?}");
        assert!(names.iter().all(|n| n.starts_with('/')), "{names:?}");
    }

    #[test]
    fn test_package_excludes_removed_and_log() {
        let (dir, storage, package) = setup();
        let ctx = PathContext::source();
        storage.write_all(21, "main.tex", &ctx, b"hello").unwrap();
        fs::create_dir_all(dir.path().join("21/removed")).unwrap();
        fs::write(dir.path().join("21/removed/old.tex"), b"gone").unwrap();
        fs::write(dir.path().join("21/source.log"), b"log").unwrap();
        let path = package.pack().unwrap();
        let names = member_names(&path);
        assert!(names.iter().all(|n| !n.contains("removed")));
        assert!(names.iter().all(|n| !n.contains("source.log")));
    }

    #[test]
    fn test_checksum_is_stable_until_source_changes() {
        let (_dir, storage, package) = setup();
        let ctx = PathContext::source();
        storage.write_all(21, "main.tex", &ctx, b"hello").unwrap();
        let first = package.checksum().unwrap().unwrap();
        let second = package.checksum().unwrap().unwrap();
        assert_eq!(first, second);

        // Any mutation must change the checksum.
        std::thread::sleep(std::time::Duration::from_millis(20));
        storage.write_all(21, "main.tex", &ctx, b"changed").unwrap();
        assert!(package.stale());
        let third = package.checksum().unwrap().unwrap();
        assert_ne!(first, third);
    }

    #[test]
    fn test_checksum_is_urlsafe_base64_md5() {
        let (_dir, storage, package) = setup();
        let ctx = PathContext::source();
        storage.write_all(21, "main.tex", &ctx, b"hello").unwrap();
        let sum = package.checksum().unwrap().unwrap();
        // 16 raw bytes encode to 24 characters with padding.
        assert_eq!(sum.len(), 24);
        assert!(sum.ends_with("=="));
        assert!(!sum.contains('+'));
        assert!(!sum.contains('/'));
    }

    #[test]
    fn test_stale_after_new_file() {
        let (_dir, storage, package) = setup();
        let ctx = PathContext::source();
        storage.write_all(21, "main.tex", &ctx, b"hello").unwrap();
        package.pack().unwrap();
        assert!(!package.stale());
        std::thread::sleep(std::time::Duration::from_millis(20));
        storage.write_all(21, "new.tex", &ctx, b"more").unwrap();
        assert!(package.stale());
    }

    #[test]
    fn test_size_builds_on_demand() {
        let (_dir, storage, package) = setup();
        let ctx = PathContext::source();
        storage.write_all(21, "main.tex", &ctx, b"hello").unwrap();
        assert!(!package.exists());
        assert!(package.size_bytes().unwrap() > 0);
        assert!(package.exists());
    }

    #[test]
    fn test_modified_errors_when_absent() {
        let (_dir, _storage, package) = setup();
        assert!(package.modified().is_err());
    }

    #[test]
    fn test_open_rebuilds_stale_package() {
        let (_dir, storage, package) = setup();
        let ctx = PathContext::source();
        storage.write_all(21, "main.tex", &ctx, b"hello").unwrap();
        let mut f = package.open().unwrap();
        let mut buf = Vec::new();
        f.read_to_end(&mut buf).unwrap();
        assert!(!buf.is_empty());
    }
}
