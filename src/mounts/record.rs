// src/mounts/record.rs

//! Mount records and the longest-prefix catalog built from them.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use anyhow::Result;
use tracing::debug;

use crate::mounts::provider::MountInfoProvider;

/// One mounted filesystem as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRecord {
    pub mount_path: PathBuf,
    pub device_name: String,
    /// Filesystem type tag exactly as the platform spells it (`ext4`, `NTFS`, ...).
    pub fs_type: String,
    pub remote: bool,
    pub case_sensitive: bool,
    pub case_preserving: bool,
}

impl MountRecord {
    /// A local, case-sensitive, case-preserving mount.
    pub fn local(
        mount_path: impl Into<PathBuf>,
        device_name: impl Into<String>,
        fs_type: impl Into<String>,
    ) -> Self {
        Self {
            mount_path: mount_path.into(),
            device_name: device_name.into(),
            fs_type: fs_type.into(),
            remote: false,
            case_sensitive: true,
            case_preserving: true,
        }
    }
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    /// Normalized mount path with a trailing separator, ASCII-folded when the
    /// entry matches case-insensitively.
    prefix: String,
    case_sensitive: bool,
    /// Every record mounted at this path, in the order they were reported.
    records: Vec<MountRecord>,
}

impl CatalogEntry {
    fn new(exact: String, record: MountRecord) -> Self {
        let mut entry = Self {
            prefix: exact,
            case_sensitive: true,
            records: Vec::new(),
        };
        entry.push(record);
        entry
    }

    fn push(&mut self, record: MountRecord) {
        if !record.case_sensitive && self.case_sensitive {
            self.case_sensitive = false;
            self.prefix = self.prefix.to_ascii_lowercase();
        }
        self.records.push(record);
    }

    fn own<'a>(&self, query: &'a NormalizedPath) -> &'a str {
        if self.case_sensitive {
            &query.exact
        } else {
            &query.folded
        }
    }

    fn matches(&self, query: &NormalizedPath) -> bool {
        self.own(query).starts_with(&self.prefix)
    }
}

/// A query path in both exact and ASCII-folded form.
#[derive(Debug, Clone)]
pub(crate) struct NormalizedPath {
    pub(crate) exact: String,
    pub(crate) folded: String,
}

impl NormalizedPath {
    pub(crate) fn new(path: &Path) -> Self {
        let exact = normalize_dir_prefix(path);
        let folded = exact.to_ascii_lowercase();
        Self { exact, folded }
    }
}

/// Immutable snapshot of the machine's mounts, most specific path first.
///
/// Built once at startup and shared read-only. Nested mounts resolve to the
/// innermost mount path because entries are sorted by normalized path
/// length, longest first.
#[derive(Debug, Clone, Default)]
pub struct MountCatalog {
    entries: Vec<CatalogEntry>,
}

impl MountCatalog {
    /// Build a catalog from an unordered list of records.
    ///
    /// Records sharing a mount path are kept together under one entry; a
    /// lookup at that path sees all of them.
    pub fn new(records: impl IntoIterator<Item = MountRecord>) -> Self {
        let mut by_prefix: HashMap<String, usize> = HashMap::new();
        let mut entries: Vec<CatalogEntry> = Vec::new();

        for record in records {
            let exact = normalize_dir_prefix(&record.mount_path);
            match by_prefix.get(&exact) {
                Some(&idx) => {
                    debug!(mount = %exact, "more than one file system mounted at the same path");
                    entries[idx].push(record);
                }
                None => {
                    by_prefix.insert(exact.clone(), entries.len());
                    entries.push(CatalogEntry::new(exact, record));
                }
            }
        }

        entries.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self { entries }
    }

    /// Query the platform once and build the catalog from its answer.
    pub fn from_provider(provider: &dyn MountInfoProvider) -> Result<Self> {
        let records = provider.mounts()?;
        Ok(Self::new(records))
    }

    /// All records in match order (longest mount path first).
    pub fn records(&self) -> impl Iterator<Item = &MountRecord> {
        self.entries.iter().flat_map(|e| e.records.iter())
    }

    /// Number of distinct mount paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every record mounted at the innermost mount path containing `path`.
    /// Empty when no mount contains it.
    pub fn find(&self, path: &Path) -> &[MountRecord] {
        self.find_normalized(&NormalizedPath::new(path))
    }

    pub(crate) fn find_normalized(&self, query: &NormalizedPath) -> &[MountRecord] {
        self.entries
            .iter()
            .find(|entry| entry.matches(query))
            .map(|entry| entry.records.as_slice())
            .unwrap_or_default()
    }

    /// Records mounted strictly below `query` (not at the mount owning
    /// `query` itself).
    pub(crate) fn nested_under<'a>(
        &'a self,
        query: &'a NormalizedPath,
    ) -> impl Iterator<Item = &'a MountRecord> + 'a {
        self.entries
            .iter()
            .filter(move |entry| {
                let own = entry.own(query);
                entry.prefix.len() > own.len() && entry.prefix.starts_with(own)
            })
            .flat_map(|entry| entry.records.iter())
    }
}

/// Render `path` as an absolute, lexically normalized string that ends with
/// exactly one separator.
///
/// `/mnt` becomes `/mnt/` so it cannot prefix-match `/mntx/`; the root stays
/// `/`.
pub fn normalize_dir_prefix(path: &Path) -> String {
    let absolute = lexically_absolute(path);
    let mut s = absolute.to_string_lossy().into_owned();
    if !s.ends_with(MAIN_SEPARATOR) {
        s.push(MAIN_SEPARATOR);
    }
    s
}

/// Make `path` absolute against the current directory and resolve `.` and
/// `..` without touching the filesystem.
pub fn lexically_absolute(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `pop` refuses to go above the root.
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
