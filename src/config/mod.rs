// src/config/mod.rs

//! Configuration loading and validation for filestate.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate cache locations and source extensions (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{CacheSection, ConfigFile, RawConfigFile, SourceFilesSection};
pub use validate::validate_raw_config;
