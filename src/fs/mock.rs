// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    /// Yields `prefix`, then fails every further read.
    Broken(Vec<u8>),
}

/// In-memory filesystem for tests.
///
/// Also records how many times each path was opened for reading and how many
/// whole-file writes happened, so tests can assert that a cache hit never
/// touched file content and that appends do not rewrite the file.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    opens: Arc<Mutex<HashMap<PathBuf, usize>>>,
    writes: Arc<Mutex<usize>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.lock_files()
            .insert(path.as_ref().to_path_buf(), MockEntry::File(content.into()));
    }

    /// Add a file whose reads fail with an I/O error once `prefix` is consumed.
    pub fn add_broken_file(&self, path: impl AsRef<Path>, prefix: impl Into<Vec<u8>>) {
        self.lock_files()
            .insert(path.as_ref().to_path_buf(), MockEntry::Broken(prefix.into()));
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        self.lock_files().remove(path.as_ref());
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.lock_files().get(path.as_ref()) {
            Some(MockEntry::File(content)) => Some(content.clone()),
            _ => None,
        }
    }

    /// Number of times `path` has been opened through [`FileSystem::open_read`].
    pub fn open_count(&self, path: impl AsRef<Path>) -> usize {
        self.opens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path.as_ref())
            .copied()
            .unwrap_or(0)
    }

    /// Number of whole-file replacements through [`FileSystem::write`].
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_files(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct BrokenReader {
    prefix: Cursor<Vec<u8>>,
}

impl Read for BrokenReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.prefix.read(buf)?;
        if n == 0 {
            return Err(io::Error::other("simulated read failure"));
        }
        Ok(n)
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        match self.lock_files().get(path) {
            Some(MockEntry::File(content)) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Broken(_)) => Err(anyhow!("simulated read failure: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let reader: Box<dyn Read + Send> = match self.lock_files().get(path) {
            Some(MockEntry::File(content)) => Box::new(Cursor::new(content.clone())),
            Some(MockEntry::Broken(prefix)) => Box::new(BrokenReader {
                prefix: Cursor::new(prefix.clone()),
            }),
            None => return Err(anyhow!("File not found: {:?}", path)),
        };
        *self
            .opens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_path_buf())
            .or_insert(0) += 1;
        Ok(reader)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }

    fn append(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let mut files = self.lock_files();
        match files
            .entry(path.to_path_buf())
            .or_insert_with(|| MockEntry::File(Vec::new()))
        {
            MockEntry::File(existing) => {
                existing.extend_from_slice(contents);
                Ok(())
            }
            MockEntry::Broken(_) => Err(anyhow!("simulated write failure: {:?}", path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock_files().contains_key(path)
    }
}
