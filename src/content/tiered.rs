// src/content/tiered.rs

//! Two cache tiers behind one [`ContentTypeCache`].
//!
//! - **global**: long-lived, shared across builds. Only for locations whose
//!   content cannot change without changing identity (dependency caches,
//!   immutable archives).
//! - **local**: scoped to project files and shorter-lived storage.
//!
//! The path picks the tier and nothing else. Tiers never share entries, so
//! the same hash can hold different answers in each.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::content::hash::ContentHash;
use crate::content::store::{ContentTypeCache, ContentTypeStore};
use crate::mounts::record::lexically_absolute;
use crate::types::FileContentType;

/// Decides whether a path lives in a global (immutable, shared) location.
pub trait CacheLocationPolicy: Send + Sync {
    fn is_inside_global_location(&self, path: &Path) -> bool;
}

impl<F> CacheLocationPolicy for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn is_inside_global_location(&self, path: &Path) -> bool {
        self(path)
    }
}

/// A fixed set of global cache roots, matched by whole path components.
#[derive(Debug, Clone, Default)]
pub struct GlobalCacheLocations {
    roots: Vec<PathBuf>,
}

impl GlobalCacheLocations {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            roots: roots
                .into_iter()
                .map(|p| lexically_absolute(p.as_ref()))
                .collect(),
        }
    }
}

impl CacheLocationPolicy for GlobalCacheLocations {
    fn is_inside_global_location(&self, path: &Path) -> bool {
        let path = lexically_absolute(path);
        self.roots.iter().any(|root| path.starts_with(root))
    }
}

/// Which tier served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Global,
    Local,
}

/// Routes each request to the global or local store based on its path.
pub struct TieredContentTypeCache {
    global: Arc<ContentTypeStore>,
    local: Arc<ContentTypeStore>,
    policy: Arc<dyn CacheLocationPolicy>,
}

impl Debug for TieredContentTypeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredContentTypeCache")
            .field("global", &self.global.name())
            .field("local", &self.local.name())
            .finish()
    }
}

impl TieredContentTypeCache {
    pub fn new(
        global: Arc<ContentTypeStore>,
        local: Arc<ContentTypeStore>,
        policy: Arc<dyn CacheLocationPolicy>,
    ) -> Self {
        Self {
            global,
            local,
            policy,
        }
    }

    pub fn tier_for(&self, path: &Path) -> CacheTier {
        if self.policy.is_inside_global_location(path) {
            CacheTier::Global
        } else {
            CacheTier::Local
        }
    }

    pub fn store_for(&self, path: &Path) -> &ContentTypeStore {
        match self.tier_for(path) {
            CacheTier::Global => &self.global,
            CacheTier::Local => &self.local,
        }
    }

    pub fn global(&self) -> &ContentTypeStore {
        &self.global
    }

    pub fn local(&self) -> &ContentTypeStore {
        &self.local
    }
}

impl ContentTypeCache for TieredContentTypeCache {
    fn try_get_content_type(
        &self,
        path: &Path,
        hash: &ContentHash,
    ) -> Result<Option<FileContentType>> {
        self.store_for(path).try_get(hash)
    }

    fn get_or_compute_content_type(
        &self,
        path: &Path,
        hash: &ContentHash,
        compute: &mut dyn FnMut() -> Result<FileContentType>,
    ) -> Result<FileContentType> {
        self.store_for(path).get_or_compute(hash, compute)
    }

    fn store_content_type(
        &self,
        path: &Path,
        hash: &ContentHash,
        content_type: FileContentType,
    ) -> Result<()> {
        self.store_for(path).put(*hash, content_type)
    }
}
