//! Snapshot store tests

use netbox_exporter::snapshot::{SnapshotSource, SnapshotStore};
use std::sync::Arc;

fn store_in(dir: &tempfile::TempDir) -> SnapshotStore {
    SnapshotStore::new(dir.path().join("netbox.prom"))
}

#[test]
fn test_empty_before_first_write() {
    // Given: A fresh store and no file on disk
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = store_in(&dir);

    // When: Reading
    let (data, source) = store.read_with_source();

    // Then: The document is empty and came from memory
    assert!(data.is_empty());
    assert_eq!(source, SnapshotSource::Memory);
    assert!(!store.has_snapshot());
}

#[test]
fn test_write_then_read_from_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = store_in(&dir);

    store.write(b"m 1\n").expect("write should succeed");

    let (data, source) = store.read_with_source();
    assert_eq!(data, b"m 1\n");
    assert_eq!(source, SnapshotSource::File);
    assert!(store.has_snapshot());
    assert_eq!(
        std::fs::read(dir.path().join("netbox.prom")).expect("file should exist"),
        b"m 1\n"
    );
}

#[test]
fn test_tmp_sibling_does_not_survive_write() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = store_in(&dir);

    store.write(b"m 1\n").expect("write should succeed");

    assert!(!dir.path().join("netbox.prom.tmp").exists());
}

#[test]
fn test_falls_back_to_memory_when_file_deleted() {
    // Given: A successful write
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = store_in(&dir);
    store.write(b"m 2\n").expect("write should succeed");

    // When: The file disappears behind the store's back
    std::fs::remove_file(store.path()).expect("Failed to delete snapshot");

    // Then: The same document is served from memory
    let (data, source) = store.read_with_source();
    assert_eq!(data, b"m 2\n");
    assert_eq!(source, SnapshotSource::Memory);
}

#[test]
fn test_stray_tmp_file_is_never_read() {
    // Given: A leftover half-written tmp sibling and no canonical file
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = store_in(&dir);
    std::fs::write(dir.path().join("netbox.prom.tmp"), b"m{a=\"half").expect("write tmp");

    // Then: Reads ignore it
    assert!(store.read().is_empty());
}

#[test]
fn test_failed_write_keeps_previous_snapshot() {
    // Given: A store with a good snapshot
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = store_in(&dir);
    store.write(b"m 1\n").expect("first write should succeed");

    // When: The directory vanishes so the next write cannot create its tmp file
    let path = store.path().to_path_buf();
    std::fs::remove_file(&path).expect("remove snapshot");
    std::fs::remove_dir(dir.path()).expect("remove dir");
    let result = store.write(b"m 2\n");

    // Then: The write fails with a persist error and memory still holds the old snapshot
    let err = result.expect_err("write into a missing directory should fail");
    assert!(err.to_string().contains("Failed to persist snapshot"));
    assert_eq!(store.read(), b"m 1\n");
}

#[test]
fn test_later_write_supersedes_earlier() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = store_in(&dir);

    store.write(b"m 1\n").expect("write");
    store.write(b"m 2\n").expect("write");

    assert_eq!(store.read(), b"m 2\n");
}

#[test]
fn test_concurrent_readers_never_see_torn_documents() {
    // Given: Two distinct complete documents of different sizes
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = Arc::new(store_in(&dir));
    let small = b"m 1\n".to_vec();
    let large = "m{a=\"x\"} 2\n".repeat(2000).into_bytes();
    store.write(&small).expect("initial write");

    // When: A writer alternates between them while readers poll
    let writer = {
        let store = store.clone();
        let (small, large) = (small.clone(), large.clone());
        std::thread::spawn(move || {
            for i in 0..200 {
                let doc = if i % 2 == 0 { &large } else { &small };
                store.write(doc).expect("write");
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            let (small, large) = (small.clone(), large.clone());
            std::thread::spawn(move || {
                for _ in 0..500 {
                    let data = store.read();
                    // Then: Every read is one of the complete documents
                    assert!(data == small || data == large, "torn read of {} bytes", data.len());
                }
            })
        })
        .collect();

    writer.join().expect("writer panicked");
    for reader in readers {
        reader.join().expect("reader panicked");
    }
}
