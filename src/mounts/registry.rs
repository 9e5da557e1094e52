// src/mounts/registry.rs

//! Decides whether a path may be kept under native change-watching.
//!
//! A path is watchable when the innermost mount containing it is local and
//! its filesystem type is on a fixed allow-list. Everything else is refused
//! with a [`WatchNotSupportedError`] that names the path, the mount and the
//! reason. Refusals are never downgraded: a caller that watched anyway would
//! silently miss changes.

use std::path::{Path, PathBuf};

use anyhow::Result;
use thiserror::Error;
use tracing::info;

use crate::mounts::provider::MountInfoProvider;
use crate::mounts::record::{lexically_absolute, MountCatalog, MountRecord, NormalizedPath};

/// Filesystem type tags known to deliver reliable native change events.
///
/// Matching is case-sensitive: macOS and Windows report the same filesystem
/// with different spellings, so both are listed.
pub const SUPPORTED_FILE_SYSTEM_TYPES: &[&str] = &[
    // APFS on macOS
    "apfs",
    // HFS and HFS+ on macOS
    "hfs",
    "ext3",
    "ext4",
    "btrfs",
    // NTFS on macOS
    "ntfs",
    // NTFS on Windows
    "NTFS",
    // FAT32 on macOS
    "msdos",
    // FAT32 on Windows
    "FAT32",
    // exFAT on macOS
    "exfat",
    // exFAT on Windows
    "exFAT",
    // VirtualBox shared folders
    "vboxsf",
];

/// Why a path cannot be watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchUnsupportedReason {
    /// The owning mount is a network filesystem.
    Remote,
    /// The owning mount is local but its type is not on the allow-list.
    UnsupportedFileSystemType,
    /// No known mount contains the path.
    UnknownFileSystem,
}

#[derive(Debug, Clone, Error)]
#[error(
    "cannot watch file hierarchy at '{}': {}",
    .path.display(),
    describe(.reason, .mount)
)]
pub struct WatchNotSupportedError {
    pub path: PathBuf,
    pub reason: WatchUnsupportedReason,
    /// The mount that caused the refusal; `None` for `UnknownFileSystem`.
    pub mount: Option<MountRecord>,
}

impl WatchNotSupportedError {
    pub fn mount_path(&self) -> Option<&Path> {
        self.mount.as_ref().map(|m| m.mount_path.as_path())
    }

    pub fn fs_type(&self) -> Option<&str> {
        self.mount.as_ref().map(|m| m.fs_type.as_str())
    }

    pub fn is_remote(&self) -> Option<bool> {
        self.mount.as_ref().map(|m| m.remote)
    }
}

fn describe(reason: &WatchUnsupportedReason, mount: &Option<MountRecord>) -> String {
    match (reason, mount) {
        (WatchUnsupportedReason::Remote, Some(m)) => format!(
            "file system at '{}' is remote ({} from {})",
            m.mount_path.display(),
            m.fs_type,
            m.device_name
        ),
        (WatchUnsupportedReason::UnsupportedFileSystemType, Some(m)) => format!(
            "file system type '{}' at '{}' is not supported (remote: {})",
            m.fs_type,
            m.mount_path.display(),
            m.remote
        ),
        (WatchUnsupportedReason::Remote, None)
        | (WatchUnsupportedReason::UnsupportedFileSystemType, None) => {
            "file system is not supported".to_string()
        }
        (WatchUnsupportedReason::UnknownFileSystem, _) => "file system is unknown".to_string(),
    }
}

/// `None` when `record` may be watched, otherwise the reason it may not.
pub fn unsupported_reason(record: &MountRecord) -> Option<WatchUnsupportedReason> {
    if record.remote {
        Some(WatchUnsupportedReason::Remote)
    } else if !SUPPORTED_FILE_SYSTEM_TYPES.contains(&record.fs_type.as_str()) {
        Some(WatchUnsupportedReason::UnsupportedFileSystemType)
    } else {
        None
    }
}

/// Whether native watching is reliable on the filesystem described by `record`.
pub fn supports_watching(record: &MountRecord) -> bool {
    unsupported_reason(record).is_none()
}

/// Immutable registry answering watchability questions for arbitrary paths.
///
/// Construct once at startup and share by reference; no locking is needed.
#[derive(Debug, Clone)]
pub struct WatchableFileSystemRegistry {
    catalog: MountCatalog,
}

impl WatchableFileSystemRegistry {
    pub fn new(catalog: MountCatalog) -> Self {
        for record in catalog.records() {
            info!(
                "Detected {} {}: {} from {} (remote: {}, case-sensitive: {}, case-preserving: {})",
                if supports_watching(record) { "supported" } else { "unsupported" },
                record.fs_type,
                record.mount_path.display(),
                record.device_name,
                record.remote,
                record.case_sensitive,
                record.case_preserving,
            );
        }
        Self { catalog }
    }

    /// Query `provider` once and build the registry from its mounts.
    pub fn from_provider(provider: &dyn MountInfoProvider) -> Result<Self> {
        Ok(Self::new(MountCatalog::from_provider(provider)?))
    }

    pub fn catalog(&self) -> &MountCatalog {
        &self.catalog
    }

    pub fn is_watchable(&self, path: &Path) -> bool {
        self.ensure_watchable(path).is_ok()
    }

    /// Succeeds iff every file system mounted at the innermost mount path
    /// containing `path` supports watching.
    ///
    /// With several records at that path, the first unsupported one is
    /// reported.
    pub fn ensure_watchable(&self, path: &Path) -> std::result::Result<(), WatchNotSupportedError> {
        let query = NormalizedPath::new(path);
        let records = self.catalog.find_normalized(&query);
        if records.is_empty() {
            return Err(WatchNotSupportedError {
                path: lexically_absolute(path),
                reason: WatchUnsupportedReason::UnknownFileSystem,
                mount: None,
            });
        }

        first_unsupported(path, records.iter())
    }

    /// Like [`ensure_watchable`](Self::ensure_watchable), but also refuses
    /// when any mount nested below `path` cannot be watched, since changes
    /// under that mount would go unnoticed.
    pub fn ensure_hierarchy_watchable(
        &self,
        path: &Path,
    ) -> std::result::Result<(), WatchNotSupportedError> {
        self.ensure_watchable(path)?;

        let query = NormalizedPath::new(path);
        first_unsupported(path, self.catalog.nested_under(&query))
    }
}

fn first_unsupported<'a>(
    path: &Path,
    records: impl Iterator<Item = &'a MountRecord>,
) -> std::result::Result<(), WatchNotSupportedError> {
    for record in records {
        if let Some(reason) = unsupported_reason(record) {
            return Err(WatchNotSupportedError {
                path: lexically_absolute(path),
                reason,
                mount: Some(record.clone()),
            });
        }
    }
    Ok(())
}
