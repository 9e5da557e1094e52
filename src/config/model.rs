// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::StoreMode;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [cache]
/// dir = ".filestate"
/// global_store = "file"
/// local_store = "memory"
/// global_locations = ["/home/me/.cache/deps"]
///
/// [source_files]
/// include_extensions = ["py"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub source_files: SourceFilesSection,
}

/// `[cache]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    /// Directory holding file-backed tiers. Relative paths resolve against
    /// the directory containing the config file.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    /// Backing for the global (shared, immutable locations) tier.
    #[serde(default = "default_global_store")]
    pub global_store: StoreMode,

    /// Backing for the local (project files) tier.
    #[serde(default)]
    pub local_store: StoreMode,

    /// Roots whose content never changes without changing identity.
    #[serde(default)]
    pub global_locations: Vec<PathBuf>,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".filestate")
}

fn default_global_store() -> StoreMode {
    StoreMode::File
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            global_store: default_global_store(),
            local_store: StoreMode::default(),
            global_locations: Vec::new(),
        }
    }
}

/// `[source_files]` section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SourceFilesSection {
    /// Extensions (without the dot) always treated as source text.
    #[serde(default)]
    pub include_extensions: Vec<String>,
}

/// Validated configuration. Only constructible through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub cache: CacheSection,
    pub source_files: SourceFilesSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(cache: CacheSection, source_files: SourceFilesSection) -> Self {
        Self {
            cache,
            source_files,
        }
    }

    /// The cache directory, resolved against `base` when relative.
    pub fn cache_dir(&self, base: &Path) -> PathBuf {
        if self.cache.dir.is_absolute() {
            self.cache.dir.clone()
        } else {
            base.join(&self.cache.dir)
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(CacheSection::default(), SourceFilesSection::default())
    }
}
