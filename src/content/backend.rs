// src/content/backend.rs

//! Durable key/value storage behind a content-type cache tier.
//!
//! Backends only store and fetch. Defaults, write-back and single
//! computation per key live one level up in [`ContentTypeStore`].
//!
//! [`ContentTypeStore`]: crate::content::store::ContentTypeStore

use std::collections::HashMap;
use std::fmt::{Debug, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::content::hash::ContentHash;
use crate::fs::FileSystem;
use crate::types::FileContentType;

/// File name of a tier's index inside its directory.
pub const CONTENT_TYPES_FILE: &str = "content-types";

/// Abstract storage for content-type entries.
///
/// Implementations must be safe to call from many threads at once.
pub trait IndexedStore: Send + Sync + Debug {
    fn get(&self, hash: &ContentHash) -> Result<Option<FileContentType>>;
    /// Store `content_type` for `hash`, replacing any previous entry.
    fn put(&self, hash: ContentHash, content_type: FileContentType) -> Result<()>;
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Stores entries in memory only.
#[derive(Debug, Default)]
pub struct MemoryIndexedStore {
    map: RwLock<HashMap<ContentHash, FileContentType>>,
}

impl MemoryIndexedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndexedStore for MemoryIndexedStore {
    fn get(&self, hash: &ContentHash) -> Result<Option<FileContentType>> {
        let map = self.map.read().unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(hash).copied())
    }

    fn put(&self, hash: ContentHash, content_type: FileContentType) -> Result<()> {
        let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(hash, content_type);
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.map.read().unwrap_or_else(PoisonError::into_inner).len())
    }
}

/// Stores entries in a line-oriented file (`<hex hash> <text|binary>`).
///
/// Each `put` that changes an entry appends one line; when a hash appears
/// more than once, the last line wins. `open` reads the file and, if it
/// holds superseded or corrupt lines, rewrites it with one line per entry.
/// A `put` that stores the value already present does not touch disk.
#[derive(Debug)]
pub struct FileIndexedStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    map: RwLock<HashMap<ContentHash, FileContentType>>,
}

impl FileIndexedStore {
    /// Open (or lazily create) the index at `<dir>/content-types`.
    pub fn open(fs: Arc<dyn FileSystem>, dir: &Path) -> Result<Self> {
        let path = dir.join(CONTENT_TYPES_FILE);
        let loaded = load_entries(fs.as_ref(), &path)?;
        if loaded.stale_lines > 0 {
            debug!(path = ?path, stale = loaded.stale_lines, "compacting content-type index");
            save_entries(fs.as_ref(), &path, &loaded.map)?;
        }
        info!(path = ?path, entries = loaded.map.len(), "opened content-type index (file)");
        Ok(Self {
            fs,
            path,
            map: RwLock::new(loaded.map),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IndexedStore for FileIndexedStore {
    fn get(&self, hash: &ContentHash) -> Result<Option<FileContentType>> {
        let map = self.map.read().unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(hash).copied())
    }

    fn put(&self, hash: ContentHash, content_type: FileContentType) -> Result<()> {
        // Held across the append so concurrent puts reach disk in map order.
        let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
        if map.get(&hash) == Some(&content_type) {
            return Ok(());
        }
        let line = format!("{} {}\n", hash, content_type);
        self.fs
            .append(&self.path, line.as_bytes())
            .with_context(|| format!("appending to content-type index at {:?}", self.path))?;
        map.insert(hash, content_type);
        debug!(%hash, %content_type, "stored content type (file)");
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.map.read().unwrap_or_else(PoisonError::into_inner).len())
    }
}

struct LoadedEntries {
    map: HashMap<ContentHash, FileContentType>,
    /// Lines that are corrupt or superseded by a later line for the same hash.
    stale_lines: usize,
}

fn load_entries(fs: &dyn FileSystem, path: &Path) -> Result<LoadedEntries> {
    let mut loaded = LoadedEntries {
        map: HashMap::new(),
        stale_lines: 0,
    };
    if !fs.exists(path) {
        return Ok(loaded);
    }

    let contents = fs
        .read_to_string(path)
        .with_context(|| format!("reading content-type index at {:?}", path))?;

    // An interrupted append leaves no trailing newline; the next append
    // would join onto it.
    if !contents.is_empty() && !contents.ends_with('\n') {
        loaded.stale_lines += 1;
    }

    for (lineno, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            loaded.stale_lines += 1;
            continue;
        }
        match parse_entry(trimmed) {
            Some((hash, content_type)) => {
                if loaded.map.insert(hash, content_type).is_some() {
                    loaded.stale_lines += 1;
                }
            }
            None => {
                warn!(path = ?path, line = lineno + 1, "skipping corrupt content-type entry");
                loaded.stale_lines += 1;
            }
        }
    }

    Ok(loaded)
}

fn parse_entry(line: &str) -> Option<(ContentHash, FileContentType)> {
    let (hash, content_type) = line.split_once(char::is_whitespace)?;
    Some((hash.parse().ok()?, content_type.parse().ok()?))
}

fn save_entries(
    fs: &dyn FileSystem,
    path: &Path,
    map: &HashMap<ContentHash, FileContentType>,
) -> Result<()> {
    // Sorted so the compacted file is stable across runs.
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by_key(|(hash, _)| **hash);

    let mut out = String::with_capacity(entries.len() * 72);
    for (hash, content_type) in entries {
        let _ = writeln!(out, "{} {}", hash, content_type);
    }

    fs.write(path, out.as_bytes())
        .with_context(|| format!("writing content-type index at {:?}", path))
}
