use std::fmt;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use blake3::Hasher;

use crate::fs::FileSystem;

const BUF_SIZE: usize = 8192;

/// Identity of a byte sequence: a 32-byte BLAKE3 digest.
///
/// This is the only key used by the content-type caches. It never encodes
/// where the bytes came from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash an in-memory byte slice.
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from_bytes(self.0).to_hex().to_string()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl FromStr for ContentHash {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        blake3::Hash::from_hex(s.trim())
            .map(|h| Self(*h.as_bytes()))
            .map_err(|e| format!("invalid content hash {s:?}: {e}"))
    }
}

/// Hash everything `reader` yields, verbatim.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<ContentHash> {
    let mut hasher = Hasher::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(ContentHash(*hasher.finalize().as_bytes()))
}

/// Compute the verbatim hash of a single file.
pub fn hash_file(fs: &dyn FileSystem, path: &Path) -> Result<ContentHash> {
    let reader = fs.open_read(path)?;
    hash_reader(reader).with_context(|| format!("hashing file {:?}", path))
}

/// Hash `reader` as text with `\r\n` and lone `\r` rewritten to `\n`.
///
/// Two text files that differ only in line endings produce the same hash.
pub fn hash_normalized_line_endings<R: Read>(mut reader: R) -> io::Result<ContentHash> {
    let mut hasher = Hasher::new();
    let mut buf = [0u8; BUF_SIZE];
    let mut out = Vec::with_capacity(BUF_SIZE);
    // A `\r` at the end of a chunk may be the first half of `\r\n`.
    let mut pending_cr = false;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if n == 0 {
            break;
        }

        out.clear();
        for &byte in &buf[..n] {
            if pending_cr {
                pending_cr = false;
                out.push(b'\n');
                if byte == b'\n' {
                    continue;
                }
            }
            if byte == b'\r' {
                pending_cr = true;
            } else {
                out.push(byte);
            }
        }
        hasher.update(&out);
    }

    if pending_cr {
        hasher.update(b"\n");
    }
    Ok(ContentHash(*hasher.finalize().as_bytes()))
}
