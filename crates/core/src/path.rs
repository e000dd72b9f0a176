//! Workspace-relative path helpers
//!
//! All paths handled by the core are POSIX-style, relative, and use `/` as
//! the only separator. These helpers are purely lexical; nothing here
//! touches the filesystem. Containment against an area root is decided by
//! [`normalize`]: a path that cannot be normalized without escaping its
//! root is unsafe by definition.

/// Lexically normalize a relative path.
///
/// Collapses `.` and empty segments and resolves `..` against earlier
/// segments. Returns `None` when the path is absolute or when a `..`
/// segment would climb above the root; such paths must be refused by
/// callers.
pub fn normalize(path: &str) -> Option<String> {
    if path.starts_with('/') {
        return None;
    }
    let mut out: Vec<&str> = Vec::new();
    for comp in path.split('/') {
        match comp {
            "" | "." => continue,
            ".." => {
                out.pop()?;
            }
            c => out.push(c),
        }
    }
    Some(out.join("/"))
}

/// Join a directory and a name. An empty directory yields the bare name.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

/// Final component of a path (the file or directory name).
pub fn basename(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

/// Directory part of a path, empty for top-level entries.
pub fn parent(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[..idx],
        None => "",
    }
}

/// Extension without the leading dot, empty when there is none.
pub fn extension(path: &str) -> &str {
    let name = basename(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[idx + 1..],
        _ => "",
    }
}

/// Path with the final extension removed.
pub fn strip_extension(path: &str) -> &str {
    let name = basename(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &path[..path.len() - (name.len() - idx)],
        _ => path,
    }
}

/// Collapse directory separators to underscores, for depositing files in
/// the flat removed area without collisions.
pub fn flatten(path: &str) -> String {
    path.trim_matches('/').replace('/', "_")
}

/// Strip a single leading `./`, as found on many archive member names.
pub fn strip_dot_prefix(path: &str) -> &str {
    path.strip_prefix("./").unwrap_or(path)
}
