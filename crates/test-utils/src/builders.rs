#![allow(dead_code)]

use std::sync::Arc;

use filestate::content::{ContentHash, ContentTypeStore, MemoryIndexedStore};
use filestate::mounts::{MountCatalog, MountRecord, WatchableFileSystemRegistry};

/// Builder for `MountRecord` to simplify test setup.
///
/// Defaults to a local, case-sensitive, case-preserving `ext4` mount.
pub struct MountRecordBuilder {
    record: MountRecord,
}

impl MountRecordBuilder {
    pub fn new(mount_path: &str) -> Self {
        Self {
            record: MountRecord::local(mount_path, format!("/dev/test{}", mount_path.len()), "ext4"),
        }
    }

    pub fn fs_type(mut self, fs_type: &str) -> Self {
        self.record.fs_type = fs_type.to_string();
        self
    }

    pub fn device(mut self, device: &str) -> Self {
        self.record.device_name = device.to_string();
        self
    }

    pub fn remote(mut self, remote: bool) -> Self {
        self.record.remote = remote;
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.record.case_sensitive = false;
        self
    }

    pub fn build(self) -> MountRecord {
        self.record
    }
}

/// Registry over exactly `records`.
pub fn registry_of(records: Vec<MountRecord>) -> WatchableFileSystemRegistry {
    WatchableFileSystemRegistry::new(MountCatalog::new(records))
}

/// Content hash of `bytes`.
pub fn hash_of(bytes: &[u8]) -> ContentHash {
    ContentHash::of(bytes)
}

/// Memory-backed store tier named `name`.
pub fn memory_store(name: &str) -> Arc<ContentTypeStore> {
    Arc::new(ContentTypeStore::new(name, Box::new(MemoryIndexedStore::new())))
}
