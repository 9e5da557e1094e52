use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use filestate::content::{classify, is_control_character, ContentTypeDetectingReader};
use filestate::types::FileContentType;
use filestate_test_utils::init_tracing;
use proptest::prelude::*;

/// Reader that records how much was read and whether it was dropped.
struct TrackingReader {
    inner: Cursor<Vec<u8>>,
    bytes_read: Arc<AtomicUsize>,
    dropped: Arc<AtomicBool>,
    chunk: usize,
}

impl TrackingReader {
    fn new(data: Vec<u8>, chunk: usize) -> (Self, Arc<AtomicUsize>, Arc<AtomicBool>) {
        let bytes_read = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicBool::new(false));
        let reader = Self {
            inner: Cursor::new(data),
            bytes_read: bytes_read.clone(),
            dropped: dropped.clone(),
            chunk,
        };
        (reader, bytes_read, dropped)
    }
}

impl Read for TrackingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = buf.len().min(self.chunk);
        let n = self.inner.read(&mut buf[..limit])?;
        self.bytes_read.fetch_add(n, Ordering::SeqCst);
        Ok(n)
    }
}

impl Drop for TrackingReader {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

/// Yields `prefix`, then fails.
struct FailingReader {
    prefix: Cursor<Vec<u8>>,
    dropped: Arc<AtomicBool>,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.prefix.read(buf)? {
            0 => Err(io::Error::new(io::ErrorKind::ConnectionReset, "source closed")),
            n => Ok(n),
        }
    }
}

impl Drop for FailingReader {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

#[test]
fn plain_text_with_common_whitespace_is_text() {
    init_tracing();
    assert_eq!(classify(&b"hello\tworld\n"[..]).unwrap(), FileContentType::Text);
    assert_eq!(
        classify(&b"line one\r\nline two\x0cpage\r"[..]).unwrap(),
        FileContentType::Text
    );
}

#[test]
fn empty_input_is_text() {
    init_tracing();
    assert_eq!(classify(io::empty()).unwrap(), FileContentType::Text);
}

#[test]
fn any_uncommon_control_byte_makes_binary() {
    init_tracing();
    assert_eq!(classify(&b"\x01"[..]).unwrap(), FileContentType::Binary);
    assert_eq!(classify(&b"abc\x01def"[..]).unwrap(), FileContentType::Binary);
    assert_eq!(classify(&b"trailing nul\0"[..]).unwrap(), FileContentType::Binary);
    assert_eq!(classify(&b"\x1b[31mred\x1b[0m"[..]).unwrap(), FileContentType::Binary);
}

#[test]
fn high_bytes_and_delete_are_not_control_characters() {
    init_tracing();
    assert!(!is_control_character(0x7f));
    assert!(!is_control_character(0xff));
    assert!(!is_control_character(b' '));
    assert_eq!(
        classify("grüße, 世界\n".as_bytes()).unwrap(),
        FileContentType::Text
    );
}

#[test]
fn classification_stops_early_and_releases_the_source() {
    init_tracing();
    let mut data = vec![b'a'; 64 * 1024];
    data[10] = 0x02;
    let total = data.len();
    let (reader, bytes_read, dropped) = TrackingReader::new(data, 1024);

    assert_eq!(classify(reader).unwrap(), FileContentType::Binary);
    assert!(bytes_read.load(Ordering::SeqCst) < total);
    assert!(dropped.load(Ordering::SeqCst));
}

#[test]
fn text_is_read_to_the_end() {
    init_tracing();
    let data = vec![b'x'; 20_000];
    let (reader, bytes_read, dropped) = TrackingReader::new(data, 333);

    assert_eq!(classify(reader).unwrap(), FileContentType::Text);
    assert_eq!(bytes_read.load(Ordering::SeqCst), 20_000);
    assert!(dropped.load(Ordering::SeqCst));
}

#[test]
fn io_errors_propagate_unchanged_and_source_is_released() {
    init_tracing();
    let dropped = Arc::new(AtomicBool::new(false));
    let reader = FailingReader {
        prefix: Cursor::new(b"plain text".to_vec()),
        dropped: dropped.clone(),
    };

    let err = classify(reader).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    assert_eq!(err.to_string(), "source closed");
    assert!(dropped.load(Ordering::SeqCst));
}

#[test]
fn detecting_reader_passes_bytes_through_and_keeps_binary_sticky() {
    init_tracing();
    let data = b"text\x00then more text".to_vec();
    let mut reader = ContentTypeDetectingReader::new(Cursor::new(data.clone()));

    let mut copied = Vec::new();
    reader.read_to_end(&mut copied).unwrap();
    assert_eq!(copied, data);
    assert!(reader.is_binary());
    assert_eq!(reader.finish(), FileContentType::Binary);
}

#[test]
fn detecting_reader_reports_only_what_was_read() {
    init_tracing();
    let mut reader = ContentTypeDetectingReader::new(Cursor::new(b"abcd\x03".to_vec()));

    let mut head = [0u8; 4];
    reader.read_exact(&mut head).unwrap();
    assert!(!reader.is_binary());
    // Aborted before the control byte: verdict covers the consumed prefix.
    assert_eq!(reader.finish(), FileContentType::Text);
}

proptest! {
    #[test]
    fn bytes_without_control_characters_classify_as_text(
        data in proptest::collection::vec(
            prop_oneof![Just(0x09u8), Just(0x0au8), Just(0x0cu8), Just(0x0du8), 0x20u8..=0xff],
            0..4096,
        )
    ) {
        prop_assert_eq!(classify(&data[..]).unwrap(), FileContentType::Text);
    }

    #[test]
    fn inserting_one_control_character_classifies_as_binary(
        mut data in proptest::collection::vec(0x20u8..=0x7e, 0..4096),
        pos in any::<prop::sample::Index>(),
        control in (0x00u8..0x20).prop_filter("common whitespace", |b| !matches!(*b, 0x09 | 0x0a | 0x0c | 0x0d)),
    ) {
        let at = pos.index(data.len() + 1);
        data.insert(at, control);
        prop_assert_eq!(classify(&data[..]).unwrap(), FileContentType::Binary);
    }

    #[test]
    fn detecting_reader_agrees_with_classify(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let mut reader = ContentTypeDetectingReader::new(&data[..]);
        io::copy(&mut reader, &mut io::sink()).unwrap();
        prop_assert_eq!(reader.finish(), classify(&data[..]).unwrap());
    }
}
