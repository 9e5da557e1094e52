// src/content/detect.rs

//! Heuristic text/binary detection.
//!
//! Content is "likely binary" as soon as it contains a control character
//! other than tab, line feed, form feed or carriage return, the same rule
//! diff tools use to decide whether to show a textual diff. This is not a
//! MIME or encoding detector and it can be wrong in both directions.

use std::io::{self, Read};

use crate::types::FileContentType;

const BUF_SIZE: usize = 8192;

/// Whether `byte` marks content as binary.
pub fn is_control_character(byte: u8) -> bool {
    byte < 0x20 && !matches!(byte, 0x09 | 0x0a | 0x0c | 0x0d)
}

/// A reader that classifies the bytes flowing through it.
///
/// Wraps any [`Read`] and passes data through unchanged, so classification
/// piggybacks on a read pass the caller makes anyway (e.g. hashing). The
/// verdict is only available through [`finish`](Self::finish), which
/// consumes the wrapper and releases the underlying source.
#[derive(Debug)]
pub struct ContentTypeDetectingReader<R> {
    inner: R,
    control_characters_found: bool,
}

impl<R: Read> ContentTypeDetectingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            control_characters_found: false,
        }
    }

    /// True once a control character has been seen. Never reverts.
    pub fn is_binary(&self) -> bool {
        self.control_characters_found
    }

    /// Verdict for everything read so far. Dropping `self` releases the source.
    pub fn finish(self) -> FileContentType {
        if self.control_characters_found {
            FileContentType::Binary
        } else {
            FileContentType::Text
        }
    }
}

impl<R: Read> Read for ContentTypeDetectingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if !self.control_characters_found && buf[..n].iter().copied().any(is_control_character) {
            self.control_characters_found = true;
        }
        Ok(n)
    }
}

/// Classify a byte stream, reading it at most once and stopping as soon as
/// the answer is `Binary`.
///
/// The source is moved in and dropped on every exit path, including I/O
/// errors, which are returned unchanged.
pub fn classify<R: Read>(source: R) -> io::Result<FileContentType> {
    let mut reader = ContentTypeDetectingReader::new(source);
    let mut buf = [0u8; BUF_SIZE];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if n == 0 || reader.is_binary() {
            break;
        }
    }

    Ok(reader.finish())
}
