// src/mounts/provider.rs

//! Sources of mount information.
//!
//! The platform query is a cold, rare, fallible call made once at startup.
//! Everything downstream works on the [`MountRecord`]s it returns, so tests
//! can feed synthetic lists through [`StaticMountProvider`].

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::fs::{FileSystem, RealFileSystem};
use crate::mounts::record::MountRecord;

/// Location of the kernel's mount table for the current mount namespace.
pub const PROC_MOUNTS_PATH: &str = "/proc/self/mounts";

/// Filesystem types that are served over the network.
const REMOTE_FS_TYPES: &[&str] = &[
    "nfs",
    "nfs4",
    "cifs",
    "smb3",
    "smbfs",
    "ncpfs",
    "afs",
    "9p",
    "ceph",
    "glusterfs",
    "lustre",
    "davfs",
    "sshfs",
    "fuse.sshfs",
    "fuse.glusterfs",
    "fuse.rclone",
    "fuse.s3fs",
];

/// Filesystem types that fold case when looking up names.
const CASE_INSENSITIVE_FS_TYPES: &[&str] = &["vfat", "msdos", "exfat"];

/// Produces the list of mounted filesystems.
pub trait MountInfoProvider: Send + Sync {
    fn mounts(&self) -> Result<Vec<MountRecord>>;
}

/// Fixed list of mounts, in the order given.
#[derive(Debug, Clone, Default)]
pub struct StaticMountProvider {
    records: Vec<MountRecord>,
}

impl StaticMountProvider {
    pub fn new(records: Vec<MountRecord>) -> Self {
        Self { records }
    }
}

impl MountInfoProvider for StaticMountProvider {
    fn mounts(&self) -> Result<Vec<MountRecord>> {
        Ok(self.records.clone())
    }
}

/// Reads the Linux mount table (`/proc/self/mounts` format).
#[derive(Debug, Clone)]
pub struct ProcMountsProvider {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl ProcMountsProvider {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }
}

impl Default for ProcMountsProvider {
    fn default() -> Self {
        Self::new(Arc::new(RealFileSystem), PROC_MOUNTS_PATH)
    }
}

impl MountInfoProvider for ProcMountsProvider {
    fn mounts(&self) -> Result<Vec<MountRecord>> {
        let contents = self
            .fs
            .read_to_string(&self.path)
            .with_context(|| format!("reading mount table {:?}", self.path))?;
        let records = parse_proc_mounts(&contents);
        debug!(count = records.len(), path = ?self.path, "read mount table");
        Ok(records)
    }
}

/// The provider used when nothing else is configured.
///
/// Only Linux exposes a mount table we can read without native bindings;
/// elsewhere the catalog starts empty and every path reports an unknown
/// file system.
pub fn default_provider() -> Box<dyn MountInfoProvider> {
    if cfg!(target_os = "linux") {
        Box::new(ProcMountsProvider::default())
    } else {
        warn!("mount enumeration is not available on this platform; watching will be refused");
        Box::new(StaticMountProvider::default())
    }
}

/// Parse a mount table in `fstab`/`/proc/mounts` layout:
///
/// ```text
/// <device> <mount point> <type> <options> <dump> <pass>
/// ```
///
/// Malformed lines are skipped.
pub fn parse_proc_mounts(contents: &str) -> Vec<MountRecord> {
    let mut records = Vec::new();

    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut fields = trimmed.split_whitespace();
        let (Some(device), Some(mount_point), Some(fs_type)) =
            (fields.next(), fields.next(), fields.next())
        else {
            warn!(line = %trimmed, "skipping malformed mount table line");
            continue;
        };

        let device = unescape_octal(device);
        let fs_type = fs_type.to_string();
        let case_insensitive = CASE_INSENSITIVE_FS_TYPES.contains(&fs_type.as_str());

        records.push(MountRecord {
            mount_path: PathBuf::from(unescape_octal(mount_point)),
            remote: is_remote(&device, &fs_type),
            case_sensitive: !case_insensitive,
            case_preserving: fs_type != "msdos",
            device_name: device,
            fs_type,
        });
    }

    records
}

fn is_remote(device: &str, fs_type: &str) -> bool {
    if REMOTE_FS_TYPES.contains(&fs_type) {
        return true;
    }
    // `host:/export` (NFS style) or `//host/share` (SMB style).
    device.starts_with("//") || (device.contains(":/") && !device.starts_with('/'))
}

/// Decode the `\ooo` escapes the kernel uses for whitespace and backslashes.
fn unescape_octal(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal_triplet(&bytes[i + 1..i + 4]) {
            let value = (bytes[i + 1] - b'0') * 64 + (bytes[i + 2] - b'0') * 8 + (bytes[i + 3] - b'0');
            out.push(value);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn is_octal_triplet(digits: &[u8]) -> bool {
    digits.len() == 3 && digits.iter().all(|d| (b'0'..=b'7').contains(d)) && digits[0] <= b'3'
}
