// src/normalization.rs

//! Which files are always treated as source text.
//!
//! Files with a known source extension skip content detection entirely and
//! are always line-ending normalized. Extra extensions are configured up
//! front; once the filter has been handed out, the set is frozen.

use std::collections::BTreeSet;
use std::path::Path;

use crate::errors::{FileStateError, Result};

/// Extensions considered source files without any configuration.
pub const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &["java", "groovy", "kt"];

/// Immutable set of source-file extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFileFilter {
    extensions: BTreeSet<String>,
}

impl Default for SourceFileFilter {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

impl SourceFileFilter {
    /// The default extensions plus `includes`.
    pub fn new<I, S>(includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let extensions = DEFAULT_SOURCE_EXTENSIONS
            .iter()
            .map(|s| s.to_string())
            .chain(includes.into_iter().map(Into::into))
            .collect();
        Self { extensions }
    }

    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(ext))
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}

/// Collects extra source extensions until it is first evaluated.
#[derive(Debug, Default)]
pub struct SourceFileNormalization {
    includes: Vec<String>,
    evaluated: Option<SourceFileFilter>,
}

impl SourceFileNormalization {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always treat files ending in `.<extension>` as source files.
    pub fn include_extension(&mut self, extension: impl Into<String>) -> Result<()> {
        let extension = extension.into();
        if self.evaluated.is_some() {
            return Err(FileStateError::ConfigError(format!(
                "cannot include source extension '{extension}' after source file normalization was evaluated"
            )));
        }
        self.includes.push(extension);
        Ok(())
    }

    /// Freeze the configuration and return the resulting filter.
    pub fn evaluate(&mut self) -> &SourceFileFilter {
        let includes = &self.includes;
        self.evaluated
            .get_or_insert_with(|| SourceFileFilter::new(includes.iter().cloned()))
    }
}
