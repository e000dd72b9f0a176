//! Insertion-ordered index of the files in a workspace
//!
//! Live files are partitioned into source and ancillary views; removed and
//! system entries are kept apart so that external listings never see them.
//! Path keys are unique among live entries; a removed file's key may be
//! reused by a later upload.

use indexmap::IndexMap;
use sourcemill_core::{Error, FileType, Result};
use std::collections::HashMap;

use crate::file::UserFile;

/// Filters for iterating index entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct IterOptions {
    /// Include ancillary files.
    pub allow_ancillary: bool,
    /// Include removed files.
    pub allow_removed: bool,
    /// Include system files.
    pub allow_system: bool,
    /// Include directory entries.
    pub allow_directories: bool,
}

impl IterOptions {
    /// Active source files only (no ancillary, removed, system, dirs).
    pub fn source_files() -> Self {
        IterOptions::default()
    }

    /// Everything a client may see: source + ancillary, files and
    /// directories.
    pub fn client_view() -> Self {
        IterOptions {
            allow_ancillary: true,
            allow_directories: true,
            ..Default::default()
        }
    }
}

/// Per-type tallies over the active (non-ancillary, non-removed,
/// non-system) entries.
#[derive(Debug, Clone, Default)]
pub struct TypeCounts {
    per_type: HashMap<FileType, usize>,
    /// Active source files, directories excluded.
    pub files: usize,
    /// Active files including ancillary, directories excluded.
    pub all_files: usize,
    /// Ancillary files, directories excluded.
    pub ancillary: usize,
    /// Active directory entries.
    pub directories: usize,
}

impl TypeCounts {
    /// Count of active files with the given type. Directories report under
    /// `FileType::Directory`.
    pub fn count(&self, file_type: FileType) -> usize {
        self.per_type.get(&file_type).copied().unwrap_or(0)
    }
}

/// Mapping `path -> UserFile`, preserving insertion order, partitioned
/// into source / ancillary / removed / system views.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    source: IndexMap<String, UserFile>,
    ancillary: IndexMap<String, UserFile>,
    removed: IndexMap<String, UserFile>,
    system: IndexMap<String, UserFile>,
}

impl FileIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    fn live_map(&self, is_ancillary: bool) -> &IndexMap<String, UserFile> {
        if is_ancillary {
            &self.ancillary
        } else {
            &self.source
        }
    }

    /// Register a file, routing it to the partition its flags select. An
    /// existing live entry at the same path is replaced.
    pub fn insert(&mut self, file: UserFile) {
        let key = file.path.clone();
        if file.is_system {
            self.system.insert(key, file);
        } else if file.is_removed {
            self.removed.insert(key, file);
        } else if file.is_ancillary {
            self.ancillary.insert(key, file);
        } else {
            self.source.insert(key, file);
        }
    }

    /// Look up a live file.
    pub fn get(&self, path: &str) -> Option<&UserFile> {
        self.source.get(path).or_else(|| self.ancillary.get(path))
    }

    /// Look up a live file mutably.
    pub fn get_mut(&mut self, path: &str) -> Option<&mut UserFile> {
        if self.source.contains_key(path) {
            self.source.get_mut(path)
        } else {
            self.ancillary.get_mut(path)
        }
    }

    /// Look up a system file.
    pub fn get_system(&self, path: &str) -> Option<&UserFile> {
        self.system.get(path)
    }

    /// Look up a removed file.
    pub fn get_removed(&self, path: &str) -> Option<&UserFile> {
        self.removed.get(path)
    }

    /// Whether a live file exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.source.contains_key(path) || self.ancillary.contains_key(path)
    }

    /// Re-key a live entry, preserving its position and identity.
    pub fn rename(&mut self, old_path: &str, new_path: &str) -> Result<()> {
        let is_ancillary = if self.source.contains_key(old_path) {
            false
        } else if self.ancillary.contains_key(old_path) {
            true
        } else {
            return Err(Error::file_not_found(old_path));
        };
        let map = if is_ancillary {
            &mut self.ancillary
        } else {
            &mut self.source
        };
        let idx = map.get_index_of(old_path).expect("checked above");
        let (_, mut file) = map.shift_remove_index(idx).expect("checked above");
        file.path = new_path.to_string();
        map.shift_insert(idx, new_path.to_string(), file);
        Ok(())
    }

    /// Move a live entry to the removed partition, recording the reason.
    /// Removing a directory also drops every live entry beneath it.
    pub fn mark_removed(&mut self, path: &str, reason: &str) -> Result<()> {
        let mut file = self
            .source
            .shift_remove(path)
            .or_else(|| self.ancillary.shift_remove(path))
            .ok_or_else(|| Error::file_not_found(path))?;
        file.is_removed = true;
        file.reason_for_removal = Some(reason.to_string());
        let was_directory = file.is_directory;
        self.removed.insert(path.to_string(), file);

        if was_directory {
            let prefix = format!("{}/", path.trim_end_matches('/'));
            let doomed: Vec<String> = self
                .source
                .keys()
                .chain(self.ancillary.keys())
                .filter(|k| k.starts_with(&prefix))
                .cloned()
                .collect();
            for child in doomed {
                let mut f = self
                    .source
                    .shift_remove(&child)
                    .or_else(|| self.ancillary.shift_remove(&child))
                    .expect("key collected above");
                f.is_removed = true;
                f.reason_for_removal = Some(format!("Removed with directory '{}'.", path));
                self.removed.insert(child, f);
            }
        }
        Ok(())
    }

    /// Permanently drop a live entry. Returns the entry when present.
    pub fn delete(&mut self, path: &str) -> Option<UserFile> {
        self.source
            .shift_remove(path)
            .or_else(|| self.ancillary.shift_remove(path))
    }

    /// Drop every live entry, leaving removed and system partitions alone.
    pub fn clear_live(&mut self) {
        self.source.clear();
        self.ancillary.clear();
    }

    /// Iterate entries in insertion order: source first, then ancillary,
    /// then (optionally) removed and system.
    pub fn iter(&self, opts: IterOptions) -> impl Iterator<Item = &UserFile> {
        let base = self.source.values().filter(move |f| {
            opts.allow_directories || !f.is_directory
        });
        let anc = self
            .ancillary
            .values()
            .filter(move |f| opts.allow_ancillary && (opts.allow_directories || !f.is_directory));
        let removed = self
            .removed
            .values()
            .filter(move |f| opts.allow_removed);
        let system = self.system.values().filter(move |f| opts.allow_system);
        base.chain(anc).chain(removed).chain(system)
    }

    /// Paths of all entries matching the filter, in iteration order.
    pub fn paths(&self, opts: IterOptions) -> Vec<String> {
        self.iter(opts).map(|f| f.path.clone()).collect()
    }

    /// Number of live source files (directories excluded).
    pub fn file_count(&self) -> usize {
        self.source.values().filter(|f| !f.is_directory).count()
    }

    /// Number of live files including ancillary (directories excluded).
    pub fn all_file_count(&self) -> usize {
        self.file_count()
            + self
                .ancillary
                .values()
                .filter(|f| !f.is_directory)
                .count()
    }

    /// Total bytes across live source + ancillary files.
    pub fn total_size_bytes(&self) -> u64 {
        self.source
            .values()
            .chain(self.ancillary.values())
            .filter(|f| !f.is_directory)
            .map(|f| f.size_bytes)
            .sum()
    }

    /// Tally active entries by file type.
    pub fn type_counts(&self) -> TypeCounts {
        let mut counts = TypeCounts::default();
        for f in self.source.values() {
            if f.is_directory {
                counts.directories += 1;
                *counts.per_type.entry(FileType::Directory).or_insert(0) += 1;
            } else {
                counts.files += 1;
                counts.all_files += 1;
                *counts.per_type.entry(f.file_type).or_insert(0) += 1;
            }
        }
        for f in self.ancillary.values() {
            if !f.is_directory {
                counts.ancillary += 1;
                counts.all_files += 1;
            }
        }
        counts
    }

    /// Children of `dir` down to `max_depth` levels (1 = immediate
    /// children only). An empty `dir` walks from the top of the source
    /// tree. Removed and system entries are never yielded.
    pub fn iter_children<'a>(
        &'a self,
        dir: &str,
        max_depth: usize,
    ) -> impl Iterator<Item = &'a UserFile> {
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir.trim_end_matches('/'))
        };
        let base_depth = if prefix.is_empty() {
            0
        } else {
            prefix.matches('/').count()
        };
        self.source
            .values()
            .chain(self.ancillary.values())
            .filter(move |f| {
                if !f.path.starts_with(&prefix) || f.path == prefix.trim_end_matches('/') {
                    return false;
                }
                let depth = f.path.trim_end_matches('/').matches('/').count() + 1;
                depth - base_depth <= max_depth
            })
    }

    /// The single live source file, when there is exactly one.
    pub fn single_file(&self) -> Option<&UserFile> {
        let mut files = self.source.values().filter(|f| !f.is_directory);
        let first = files.next()?;
        if files.next().is_some() {
            None
        } else {
            Some(first)
        }
    }
}
