// src/mounts/mod.rs

//! Mounted filesystems and the watch-capability registry built from them.
//!
//! This module is responsible for:
//! - Enumerating mounts once at startup (`provider`).
//! - Keeping them in longest-prefix order (`record`).
//! - Answering "can this hierarchy be watched natively?" (`registry`).
//!
//! It does **not** subscribe to change events; callers decide what to do
//! with a refusal (fall back to re-scanning, disable watching, ...).

pub mod provider;
pub mod record;
pub mod registry;

pub use provider::{
    default_provider, parse_proc_mounts, MountInfoProvider, ProcMountsProvider,
    StaticMountProvider, PROC_MOUNTS_PATH,
};
pub use record::{normalize_dir_prefix, MountCatalog, MountRecord};
pub use registry::{
    supports_watching, WatchNotSupportedError, WatchUnsupportedReason,
    WatchableFileSystemRegistry, SUPPORTED_FILE_SYSTEM_TYPES,
};
