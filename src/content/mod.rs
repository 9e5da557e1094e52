// src/content/mod.rs

//! Text/binary classification of file content, cached by content hash.
//!
//! This module is responsible for:
//! - Detecting whether a byte stream is text or binary (`detect`).
//! - Identifying content by hash (`hash`).
//! - Storing verdicts per hash in a global or local tier (`backend`,
//!   `store`, `tiered`).
//! - Resolving a file's content type end to end (`resolve`).

pub mod backend;
pub mod detect;
pub mod hash;
pub mod resolve;
pub mod store;
pub mod tiered;

pub use backend::{FileIndexedStore, IndexedStore, MemoryIndexedStore, CONTENT_TYPES_FILE};
pub use detect::{classify, is_control_character, ContentTypeDetectingReader};
pub use hash::{hash_file, hash_normalized_line_endings, hash_reader, ContentHash};
pub use resolve::{ContentTypeResolver, ContentTypeSource, FileFingerprint};
pub use store::{ContentTypeCache, ContentTypeStore};
pub use tiered::{CacheLocationPolicy, CacheTier, GlobalCacheLocations, TieredContentTypeCache};
