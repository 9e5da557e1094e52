// src/content/store.rs

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use tracing::debug;

use crate::content::backend::IndexedStore;
use crate::content::hash::ContentHash;
use crate::types::{FileContentType, DEFAULT_CONTENT_TYPE};

/// Content-type lookups keyed by content hash.
///
/// Every operation takes the path the hash was computed from. Implementations
/// may use it to pick where to look, but never as part of the key: identical
/// bytes classify identically wherever they live.
pub trait ContentTypeCache: Send + Sync + Debug {
    /// The stored classification, if any. Never computes or writes.
    fn try_get_content_type(
        &self,
        path: &Path,
        hash: &ContentHash,
    ) -> Result<Option<FileContentType>>;

    /// The stored classification, or [`DEFAULT_CONTENT_TYPE`] when there is
    /// none. The default is returned only; it is not written back.
    fn get_content_type(&self, path: &Path, hash: &ContentHash) -> Result<FileContentType> {
        Ok(self
            .try_get_content_type(path, hash)?
            .unwrap_or(DEFAULT_CONTENT_TYPE))
    }

    /// The stored classification, or the result of `compute`, which is then
    /// stored. Concurrent misses for one hash run `compute` once.
    fn get_or_compute_content_type(
        &self,
        path: &Path,
        hash: &ContentHash,
        compute: &mut dyn FnMut() -> Result<FileContentType>,
    ) -> Result<FileContentType>;

    /// Store a classification, replacing any previous one for `hash`.
    fn store_content_type(
        &self,
        path: &Path,
        hash: &ContentHash,
        content_type: FileContentType,
    ) -> Result<()>;
}

/// One cache tier: a backend plus per-hash serialization of misses.
#[derive(Debug)]
pub struct ContentTypeStore {
    name: String,
    backend: Box<dyn IndexedStore>,
    in_flight: Mutex<HashMap<ContentHash, Arc<Mutex<()>>>>,
}

impl ContentTypeStore {
    pub fn new(name: impl Into<String>, backend: Box<dyn IndexedStore>) -> Self {
        Self {
            name: name.into(),
            backend,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> Result<usize> {
        self.backend.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.backend.is_empty()
    }

    pub fn try_get(&self, hash: &ContentHash) -> Result<Option<FileContentType>> {
        let found = self.backend.get(hash)?;
        match found {
            Some(content_type) => {
                debug!(store = %self.name, %hash, %content_type, "content type cache hit")
            }
            None => debug!(store = %self.name, %hash, "content type cache miss"),
        }
        Ok(found)
    }

    /// Stored value or [`DEFAULT_CONTENT_TYPE`]; misses are not written back,
    /// so a later `put` or `get_or_compute` still decides the real value.
    pub fn get(&self, hash: &ContentHash) -> Result<FileContentType> {
        Ok(self.try_get(hash)?.unwrap_or(DEFAULT_CONTENT_TYPE))
    }

    pub fn put(&self, hash: ContentHash, content_type: FileContentType) -> Result<()> {
        self.backend.put(hash, content_type)?;
        debug!(store = %self.name, %hash, %content_type, "stored content type");
        Ok(())
    }

    /// Stored value, or `compute()` stored and returned.
    ///
    /// Misses for the same hash are serialized: the first caller computes and
    /// stores, the others wait and then read the stored value. A failing
    /// `compute` stores nothing and its error is returned.
    pub fn get_or_compute<F>(&self, hash: &ContentHash, compute: F) -> Result<FileContentType>
    where
        F: FnOnce() -> Result<FileContentType>,
    {
        if let Some(found) = self.try_get(hash)? {
            return Ok(found);
        }

        let key_lock = self.key_lock(hash);
        let result = {
            let _guard = key_lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.compute_locked(hash, compute)
        };
        self.release_key_lock(hash, key_lock);
        result
    }

    fn compute_locked<F>(&self, hash: &ContentHash, compute: F) -> Result<FileContentType>
    where
        F: FnOnce() -> Result<FileContentType>,
    {
        // Someone else may have finished while we waited for the lock.
        if let Some(found) = self.backend.get(hash)? {
            return Ok(found);
        }

        debug!(store = %self.name, %hash, "computing content type");
        let content_type = compute()?;
        self.put(*hash, content_type)?;
        Ok(content_type)
    }

    fn key_lock(&self, hash: &ContentHash) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.entry(*hash).or_default().clone()
    }

    fn release_key_lock(&self, hash: &ContentHash, key_lock: Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        // The map and this caller hold the only references: nobody else is
        // waiting on the key.
        if Arc::strong_count(&key_lock) == 2 {
            in_flight.remove(hash);
        }
    }
}

impl ContentTypeCache for ContentTypeStore {
    fn try_get_content_type(
        &self,
        _path: &Path,
        hash: &ContentHash,
    ) -> Result<Option<FileContentType>> {
        self.try_get(hash)
    }

    fn get_or_compute_content_type(
        &self,
        _path: &Path,
        hash: &ContentHash,
        compute: &mut dyn FnMut() -> Result<FileContentType>,
    ) -> Result<FileContentType> {
        self.get_or_compute(hash, compute)
    }

    fn store_content_type(
        &self,
        _path: &Path,
        hash: &ContentHash,
        content_type: FileContentType,
    ) -> Result<()> {
        self.put(*hash, content_type)
    }
}
