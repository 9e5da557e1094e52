use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Whether file content is treated as text or as opaque bytes.
///
/// - `Text`: subject to line-ending normalization before fingerprinting.
/// - `Binary`: hashed verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileContentType {
    Text,
    Binary,
}

/// Returned when nothing has ever been classified for a content hash and the
/// caller did not supply a way to compute it. Unknown content is not
/// normalized.
pub const DEFAULT_CONTENT_TYPE: FileContentType = FileContentType::Binary;

impl FileContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileContentType::Text => "text",
            FileContentType::Binary => "binary",
        }
    }
}

impl fmt::Display for FileContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for FileContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(FileContentType::Text),
            "binary" => Ok(FileContentType::Binary),
            other => Err(format!(
                "invalid content type: {other} (expected \"text\" or \"binary\")"
            )),
        }
    }
}

/// Where a content-type cache tier keeps its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    /// Store entries in a file under the cache directory.
    File,
    /// Store entries in memory only (lost on restart).
    Memory,
}

impl Default for StoreMode {
    fn default() -> Self {
        StoreMode::Memory
    }
}
