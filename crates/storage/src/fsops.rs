//! Shared low-level disk operations for the storage backends
//!
//! Everything here works on resolved absolute paths; area resolution and
//! safety checks happen in the adapters before these run.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Create the parent directory chain for `path`.
pub fn ensure_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Create an empty file, with parents.
pub fn create_file(path: &Path) -> io::Result<()> {
    ensure_parent(path)?;
    File::create(path)?;
    Ok(())
}

/// Open for reading.
pub fn open_read(path: &Path) -> io::Result<File> {
    File::open(path)
}

/// Open for writing (truncate), with parents.
pub fn open_write(path: &Path) -> io::Result<File> {
    ensure_parent(path)?;
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// Open for appending, with parents.
pub fn open_append(path: &Path) -> io::Result<File> {
    ensure_parent(path)?;
    OpenOptions::new().append(true).create(true).open(path)
}

/// Copy a file, with parents for the destination.
pub fn copy_file(from: &Path, to: &Path) -> io::Result<()> {
    ensure_parent(to)?;
    fs::copy(from, to)?;
    Ok(())
}

/// Rename, replacing the destination; falls back to copy + delete across
/// filesystems.
pub fn rename_replace(from: &Path, to: &Path) -> io::Result<()> {
    ensure_parent(to)?;
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

/// Delete a file or a whole directory tree.
pub fn delete_tree(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Byte-wise file comparison.
pub fn cmp_files(a: &Path, b: &Path) -> io::Result<bool> {
    let meta_a = fs::metadata(a)?;
    let meta_b = fs::metadata(b)?;
    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }
    let mut fa = File::open(a)?;
    let mut fb = File::open(b)?;
    let mut buf_a = [0u8; 8192];
    let mut buf_b = [0u8; 8192];
    loop {
        let n = fa.read(&mut buf_a)?;
        if n == 0 {
            return Ok(true);
        }
        fb.read_exact(&mut buf_b[..n])?;
        if buf_a[..n] != buf_b[..n] {
            return Ok(false);
        }
    }
}

/// Whether the file carries a tar-family signature: gzip (`1F 8B`), bzip2
/// (`BZh`), or `ustar` at offset 257.
pub fn probe_tar_family(path: &Path) -> bool {
    let mut head = [0u8; 262];
    let n = match File::open(path).and_then(|mut f| read_up_to(&mut f, &mut head)) {
        Ok(n) => n,
        Err(_) => return false,
    };
    if n >= 2 && head[0] == 0x1F && head[1] == 0x8B {
        return true;
    }
    if n >= 4 && &head[0..3] == b"BZh" && head[3] > 0x2F {
        return true;
    }
    n >= 262 && &head[257..262] == b"ustar"
}

/// Whether the file carries a zip signature.
pub fn probe_zip(path: &Path) -> bool {
    let mut head = [0u8; 8];
    let n = match File::open(path).and_then(|mut f| read_up_to(&mut f, &mut head)) {
        Ok(n) => n,
        Err(_) => return false,
    };
    (n >= 4 && &head[0..4] == b"PK\x03\x04") || (n >= 8 && &head[0..8] == b"PK00PK\x03\x04")
}

fn read_up_to(f: &mut File, buf: &mut [u8]) -> io::Result<usize> {
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

/// Stamp mtime (and atime) to now.
pub fn touch_now(path: &Path) -> io::Result<()> {
    let now = filetime::FileTime::now();
    filetime::set_file_times(path, now, now)
}

/// Deposit `src` into `removed_dir` under `flat_name`, suffixing on
/// collision so nothing is clobbered. Returns the name actually used.
pub fn move_to_removed(src: &Path, removed_dir: &Path, flat_name: &str) -> io::Result<String> {
    fs::create_dir_all(removed_dir)?;
    let mut candidate = flat_name.to_string();
    let mut counter = 1;
    while removed_dir.join(&candidate).exists() {
        candidate = format!("{}_{}", flat_name, counter);
        counter += 1;
    }
    let dest = removed_dir.join(&candidate);
    if src.is_dir() {
        // Directories are dropped rather than retained; only their removal
        // is recorded in the log.
        fs::remove_dir_all(src)?;
    } else {
        rename_replace(src, &dest)?;
    }
    Ok(candidate)
}

/// Apply 0o664 to files and 0o775 to directories under `root`.
#[cfg(unix)]
pub fn set_tree_permissions(root: &Path, file_mode: u32, dir_mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    if !root.exists() {
        return Ok(());
    }
    for entry in walkdir::WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| {
            e.into_io_error()
                .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "walk failed"))
        })?;
        let mode = if entry.file_type().is_dir() {
            dir_mode
        } else {
            file_mode
        };
        fs::set_permissions(entry.path(), fs::Permissions::from_mode(mode))?;
    }
    Ok(())
}

/// Permissions are not applied on non-unix targets.
#[cfg(not(unix))]
pub fn set_tree_permissions(_root: &Path, _file_mode: u32, _dir_mode: u32) -> io::Result<()> {
    Ok(())
}

/// Most recent mtime of any entry under `root`, including `root` itself.
pub fn latest_mtime(root: &Path) -> io::Result<Option<std::time::SystemTime>> {
    if !root.exists() {
        return Ok(None);
    }
    let mut latest: Option<std::time::SystemTime> = None;
    for entry in walkdir::WalkDir::new(root).follow_links(false) {
        let entry =
            entry.map_err(|e| io::Error::new(io::ErrorKind::Other, format!("walk: {}", e)))?;
        let mtime = entry.metadata()?.modified()?;
        latest = Some(match latest {
            Some(prev) if prev >= mtime => prev,
            _ => mtime,
        });
    }
    Ok(latest)
}

/// Copy an entire directory tree.
pub fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    for entry in walkdir::WalkDir::new(from).follow_links(false) {
        let entry =
            entry.map_err(|e| io::Error::new(io::ErrorKind::Other, format!("walk: {}", e)))?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        let dest = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            ensure_parent(&dest)?;
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}
