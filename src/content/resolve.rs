// src/content/resolve.rs

//! Ties hashing, source-file rules, the tiered cache and the classifier
//! together for one file at a time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::content::detect::classify;
use crate::content::hash::{hash_file, hash_normalized_line_endings, ContentHash};
use crate::content::store::ContentTypeCache;
use crate::fs::FileSystem;
use crate::normalization::SourceFileFilter;
use crate::types::FileContentType;

/// How a file's content type was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentTypeSource {
    /// The extension marks it as a source file.
    SourceExtension,
    /// Read from, or computed into, the content-type cache.
    Cache,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFingerprint {
    pub path: PathBuf,
    /// Hash of the bytes as stored on disk.
    pub hash: ContentHash,
    pub content_type: FileContentType,
    pub source: ContentTypeSource,
    /// Hash with line endings normalized; only for text content.
    pub normalized_hash: Option<ContentHash>,
}

#[derive(Debug, Clone)]
pub struct ContentTypeResolver {
    fs: Arc<dyn FileSystem>,
    cache: Arc<dyn ContentTypeCache>,
    source_files: SourceFileFilter,
}

impl ContentTypeResolver {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        cache: Arc<dyn ContentTypeCache>,
        source_files: SourceFileFilter,
    ) -> Self {
        Self {
            fs,
            cache,
            source_files,
        }
    }

    /// Content type of the file at `path` whose content hashes to `hash`.
    ///
    /// Source files are text by extension. Everything else is looked up by
    /// hash; on a miss the file is classified once and the verdict stored.
    pub fn content_type(
        &self,
        path: &Path,
        hash: &ContentHash,
    ) -> Result<(FileContentType, ContentTypeSource)> {
        if self.source_files.is_source_file(path) {
            return Ok((FileContentType::Text, ContentTypeSource::SourceExtension));
        }

        let content_type = self.cache.get_or_compute_content_type(path, hash, &mut || {
            debug!(?path, "classifying file content");
            let reader = self.fs.open_read(path)?;
            classify(reader).with_context(|| format!("classifying file {:?}", path))
        })?;
        Ok((content_type, ContentTypeSource::Cache))
    }

    /// Hash, classify and (for text) normalize-hash the file at `path`.
    pub fn fingerprint(&self, path: &Path) -> Result<FileFingerprint> {
        let hash = hash_file(self.fs.as_ref(), path)?;
        let (content_type, source) = self.content_type(path, &hash)?;

        let normalized_hash = match content_type {
            FileContentType::Text => {
                let reader = self.fs.open_read(path)?;
                Some(
                    hash_normalized_line_endings(reader)
                        .with_context(|| format!("normalizing file {:?}", path))?,
                )
            }
            FileContentType::Binary => None,
        };

        Ok(FileFingerprint {
            path: path.to_path_buf(),
            hash,
            content_type,
            source,
            normalized_hash,
        })
    }
}
