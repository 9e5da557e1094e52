// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{FileStateError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::FileStateError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.cache, raw.source_files))
    }
}

pub fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_cache_section(cfg)?;
    validate_source_extensions(cfg)?;
    Ok(())
}

fn validate_cache_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.cache.dir.as_os_str().is_empty() {
        return Err(FileStateError::ConfigError(
            "[cache].dir must not be empty".to_string(),
        ));
    }

    for location in cfg.cache.global_locations.iter() {
        if !location.is_absolute() {
            return Err(FileStateError::ConfigError(format!(
                "[cache].global_locations entry {:?} must be an absolute path",
                location
            )));
        }
    }

    Ok(())
}

fn validate_source_extensions(cfg: &RawConfigFile) -> Result<()> {
    for ext in cfg.source_files.include_extensions.iter() {
        if ext.trim().is_empty() {
            return Err(FileStateError::ConfigError(
                "[source_files].include_extensions must not contain empty entries".to_string(),
            ));
        }
        if ext.starts_with('.') {
            return Err(FileStateError::ConfigError(format!(
                "source extension '{}' must be given without the leading dot",
                ext
            )));
        }
        if ext.contains('/') || ext.contains('\\') {
            return Err(FileStateError::ConfigError(format!(
                "source extension '{}' must not contain a path separator",
                ext
            )));
        }
    }
    Ok(())
}
