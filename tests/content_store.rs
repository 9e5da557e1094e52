use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use tempfile::tempdir;

use filestate::content::{
    ContentHash, ContentTypeStore, FileIndexedStore, IndexedStore, MemoryIndexedStore,
    CONTENT_TYPES_FILE,
};
use filestate::fs::mock::MockFileSystem;
use filestate::fs::{FileSystem, RealFileSystem};
use filestate::types::{FileContentType, DEFAULT_CONTENT_TYPE};
use filestate_test_utils::builders::{hash_of, memory_store};
use filestate_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn missing_entry_yields_binary_default_without_writing_it_back() -> TestResult {
    init_tracing();
    let store = memory_store("local");
    let h = hash_of(b"never seen");

    assert_eq!(DEFAULT_CONTENT_TYPE, FileContentType::Binary);
    assert_eq!(store.get(&h)?, FileContentType::Binary);
    assert_eq!(store.try_get(&h)?, None);
    assert!(store.is_empty()?);
    Ok(())
}

#[test]
fn put_then_get_round_trips_and_overrides_default() -> TestResult {
    init_tracing();
    let store = memory_store("local");
    let h = hash_of(b"some text");

    store.put(h, FileContentType::Text)?;
    assert_eq!(store.get(&h)?, FileContentType::Text);

    store.put(h, FileContentType::Binary)?;
    assert_eq!(store.get(&h)?, FileContentType::Binary);
    Ok(())
}

#[test]
fn put_is_idempotent() -> TestResult {
    init_tracing();
    let store = memory_store("local");
    let h = hash_of(b"twice");

    store.put(h, FileContentType::Text)?;
    let after_one = (store.len()?, store.try_get(&h)?);
    store.put(h, FileContentType::Text)?;
    let after_two = (store.len()?, store.try_get(&h)?);

    assert_eq!(after_one, after_two);
    assert_eq!(after_two, (1, Some(FileContentType::Text)));
    Ok(())
}

#[test]
fn get_or_compute_stores_the_computed_value() -> TestResult {
    init_tracing();
    let store = memory_store("local");
    let h = hash_of(b"compute me");
    let calls = AtomicUsize::new(0);

    let first = store.get_or_compute(&h, || {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(FileContentType::Text)
    })?;
    let second = store.get_or_compute(&h, || {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(FileContentType::Binary)
    })?;

    assert_eq!(first, FileContentType::Text);
    assert_eq!(second, FileContentType::Text);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.try_get(&h)?, Some(FileContentType::Text));
    Ok(())
}

#[test]
fn failed_computation_stores_nothing() -> TestResult {
    init_tracing();
    let store = memory_store("local");
    let h = hash_of(b"unreadable");

    let err = store
        .get_or_compute(&h, || Err(anyhow!("disk on fire")))
        .unwrap_err();
    assert!(err.to_string().contains("disk on fire"));
    assert_eq!(store.try_get(&h)?, None);

    // A later attempt may still succeed.
    assert_eq!(
        store.get_or_compute(&h, || Ok(FileContentType::Text))?,
        FileContentType::Text
    );
    Ok(())
}

#[test]
fn concurrent_misses_for_one_hash_compute_once() -> TestResult {
    init_tracing();
    const THREADS: usize = 8;

    let store = memory_store("local");
    let h = hash_of(b"contended");
    let calls = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let store = store.clone();
            let calls = calls.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                store.get_or_compute(&h, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    // Keep the window open so other threads pile up on the key.
                    thread::sleep(Duration::from_millis(50));
                    Ok(FileContentType::Text)
                })
            })
        })
        .collect();

    for handle in handles {
        let result = handle.join().expect("worker panicked")?;
        assert_eq!(result, FileContentType::Text);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn concurrent_misses_for_different_hashes_run_independently() -> TestResult {
    init_tracing();
    let store = memory_store("local");
    let calls = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0u8..16)
        .map(|i| {
            let store = store.clone();
            let calls = calls.clone();
            thread::spawn(move || {
                let h = ContentHash::of(&[i]);
                store.get_or_compute(&h, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(if i % 2 == 0 {
                        FileContentType::Text
                    } else {
                        FileContentType::Binary
                    })
                })
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked")?;
    }

    assert_eq!(calls.load(Ordering::SeqCst), 16);
    assert_eq!(store.len()?, 16);
    assert_eq!(store.get(&ContentHash::of(&[4]))?, FileContentType::Text);
    assert_eq!(store.get(&ContentHash::of(&[5]))?, FileContentType::Binary);
    Ok(())
}

#[test]
fn memory_backend_stores_and_counts_entries() -> TestResult {
    init_tracing();
    let backend = MemoryIndexedStore::new();
    let h = hash_of(b"x");
    backend.put(h, FileContentType::Text)?;
    assert_eq!(backend.get(&h)?, Some(FileContentType::Text));
    assert_eq!(backend.len()?, 1);
    Ok(())
}

#[test]
fn file_backend_persists_across_reopen() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let text = hash_of(b"text file");
    let binary = hash_of(b"\x00\x01");

    {
        let store = ContentTypeStore::new(
            "global",
            Box::new(FileIndexedStore::open(fs.clone(), dir.path())?),
        );
        store.put(text, FileContentType::Text)?;
        store.get_or_compute(&binary, || Ok(FileContentType::Binary))?;
    }

    let reopened = FileIndexedStore::open(fs, dir.path())?;
    assert_eq!(reopened.len()?, 2);
    assert_eq!(reopened.get(&text)?, Some(FileContentType::Text));
    assert_eq!(reopened.get(&binary)?, Some(FileContentType::Binary));

    let on_disk = std::fs::read_to_string(dir.path().join(CONTENT_TYPES_FILE))?;
    assert!(on_disk.contains(&format!("{} text", text)));
    assert!(on_disk.contains(&format!("{} binary", binary)));
    Ok(())
}

#[test]
fn file_backend_skips_corrupt_lines() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let good = hash_of(b"good");
    let index = format!(
        "{} text\nnot-a-hash binary\n{} sometimes\n\n{}\n",
        good,
        hash_of(b"bad type"),
        hash_of(b"no type"),
    );
    fs.add_file("/cache/local/content-types", index);

    let backend = FileIndexedStore::open(Arc::new(fs), std::path::Path::new("/cache/local"))?;
    assert_eq!(backend.len()?, 1);
    assert_eq!(backend.get(&good)?, Some(FileContentType::Text));
    Ok(())
}

#[test]
fn file_backend_does_not_rewrite_for_unchanged_put() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let path = std::path::Path::new("/cache/global");
    let backend = FileIndexedStore::open(Arc::new(fs.clone()), path)?;
    let h = hash_of(b"same");

    backend.put(h, FileContentType::Text)?;
    let index_path = path.join(CONTENT_TYPES_FILE);
    assert!(fs.contents(&index_path).is_some());

    // Remove the file behind the store's back: an unchanged put must not recreate it.
    fs.remove(&index_path);
    backend.put(h, FileContentType::Text)?;
    assert!(fs.contents(&index_path).is_none());

    backend.put(h, FileContentType::Binary)?;
    let rewritten = String::from_utf8(fs.contents(&index_path).unwrap())?;
    assert_eq!(rewritten, format!("{} binary\n", h));
    Ok(())
}

#[test]
fn file_backend_appends_instead_of_rewriting() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let dir = std::path::Path::new("/cache/global");
    let backend = FileIndexedStore::open(Arc::new(fs.clone()), dir)?;

    for i in 0u32..200 {
        backend.put(ContentHash::of(&i.to_le_bytes()), FileContentType::Text)?;
    }

    assert_eq!(fs.write_count(), 0);
    let index = String::from_utf8(fs.contents(dir.join(CONTENT_TYPES_FILE)).unwrap())?;
    assert_eq!(index.lines().count(), 200);
    // Each entry costs exactly one line: 64 hex chars, a space, "text", newline.
    assert_eq!(index.len(), 200 * 70);
    Ok(())
}

#[test]
fn file_backend_reopen_keeps_last_line_and_compacts() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let dir = std::path::Path::new("/cache/global");
    let a = hash_of(b"a");
    let b = hash_of(b"b");

    {
        let backend = FileIndexedStore::open(Arc::new(fs.clone()), dir)?;
        backend.put(a, FileContentType::Text)?;
        backend.put(b, FileContentType::Text)?;
        backend.put(a, FileContentType::Binary)?;
    }
    let index_path = dir.join(CONTENT_TYPES_FILE);
    let appended = String::from_utf8(fs.contents(&index_path).unwrap())?;
    assert_eq!(appended.lines().count(), 3);

    let reopened = FileIndexedStore::open(Arc::new(fs.clone()), dir)?;
    assert_eq!(reopened.get(&a)?, Some(FileContentType::Binary));
    assert_eq!(reopened.get(&b)?, Some(FileContentType::Text));

    assert_eq!(fs.write_count(), 1);
    let compacted = String::from_utf8(fs.contents(&index_path).unwrap())?;
    assert_eq!(compacted.lines().count(), 2);
    assert!(compacted.contains(&format!("{} binary", a)));

    // Already compact: opening again leaves the file alone.
    FileIndexedStore::open(Arc::new(fs.clone()), dir)?;
    assert_eq!(fs.write_count(), 1);
    Ok(())
}

#[test]
fn file_backend_repairs_an_interrupted_append() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let dir = std::path::Path::new("/cache/local");
    let good = hash_of(b"good");
    let index_path = dir.join(CONTENT_TYPES_FILE);
    fs.add_file(&index_path, format!("{} text\n{}", good, &hash_of(b"cut").to_hex()[..20]));

    let backend = FileIndexedStore::open(Arc::new(fs.clone()), dir)?;
    assert_eq!(backend.len()?, 1);

    let next = hash_of(b"next");
    backend.put(next, FileContentType::Binary)?;
    let index = String::from_utf8(fs.contents(&index_path).unwrap())?;
    assert_eq!(index, format!("{} text\n{} binary\n", good, next));
    Ok(())
}

#[test]
fn real_file_system_write_replaces_without_leftovers() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let fs = RealFileSystem;
    let target = dir.path().join("nested").join(CONTENT_TYPES_FILE);

    fs.write(&target, b"first\n")?;
    fs.write(&target, b"second\n")?;
    fs.append(&target, b"third\n")?;

    assert_eq!(std::fs::read_to_string(&target)?, "second\nthird\n");
    let siblings = std::fs::read_dir(target.parent().unwrap())?.count();
    assert_eq!(siblings, 1);
    Ok(())
}

#[test]
fn content_hash_hex_round_trip() -> TestResult {
    init_tracing();
    let h = hash_of(b"hello world");
    // blake3 hash of "hello world"
    assert_eq!(
        h.to_string(),
        "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
    );
    let parsed: ContentHash = h.to_string().parse()?;
    assert_eq!(parsed, h);
    assert!("zz".parse::<ContentHash>().is_err());
    Ok(())
}
