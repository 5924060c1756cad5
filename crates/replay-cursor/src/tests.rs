//! Unit tests for the replay-cursor crate.

use pubsub_types::ReplayToken;
use std::sync::Arc;
use tempfile::TempDir;

use crate::{CursorStorage, CursorStore, FilesystemStore, MemoryStore, StoredCursor};

fn token(bytes: &[u8]) -> ReplayToken {
    ReplayToken::new(bytes.to_vec()).unwrap()
}

// ============================================================================
// FilesystemStore Tests
// ============================================================================

#[tokio::test]
async fn test_filesystem_get_missing_topic() {
    let tmp = TempDir::new().unwrap();
    let store = FilesystemStore::new(tmp.path());

    assert!(store.get("/event/Foo__e").await.unwrap().is_none());
}

#[tokio::test]
async fn test_filesystem_get_missing_directory() {
    let tmp = TempDir::new().unwrap();
    let store = FilesystemStore::new(tmp.path().join("not-created-yet"));

    assert!(store.get("/event/Foo__e").await.unwrap().is_none());
}

#[tokio::test]
async fn test_filesystem_roundtrip_is_byte_exact() {
    let tmp = TempDir::new().unwrap();
    let store = FilesystemStore::new(tmp.path());

    // includes bytes that are not valid UTF-8 and a leading zero
    let original = token(&[0x00, 0xff, 0xfe, 0x10, 0x00, 0x80]);
    store.set("/event/Foo__e", &original).await.unwrap();

    let read = store.get("/event/Foo__e").await.unwrap().unwrap();
    assert_eq!(read.as_bytes(), original.as_bytes());
}

#[tokio::test]
async fn test_filesystem_set_replaces_prior_value() {
    let tmp = TempDir::new().unwrap();
    let store = FilesystemStore::new(tmp.path());

    store.set("/event/Foo__e", &token(b"tok1")).await.unwrap();
    store.set("/event/Foo__e", &token(b"tok2")).await.unwrap();

    let read = store.get("/event/Foo__e").await.unwrap().unwrap();
    assert_eq!(read.as_bytes(), b"tok2");

    // a single cursor file, no leftover temporary files
    let files: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn test_filesystem_topics_are_independent() {
    let tmp = TempDir::new().unwrap();
    let store = FilesystemStore::new(tmp.path());

    store.set("/event/A__e", &token(b"a")).await.unwrap();
    store.set("/event/B__e", &token(b"b")).await.unwrap();

    assert_eq!(store.get("/event/A__e").await.unwrap().unwrap().as_bytes(), b"a");
    assert_eq!(store.get("/event/B__e").await.unwrap().unwrap().as_bytes(), b"b");
    assert_ne!(store.path_for("/event/A__e"), store.path_for("/event/B__e"));
}

#[tokio::test]
async fn test_filesystem_persists_across_instances() {
    let tmp = TempDir::new().unwrap();

    FilesystemStore::new(tmp.path())
        .set("/data/AccountChangeEvent", &token(b"tok1"))
        .await
        .unwrap();

    let reopened = FilesystemStore::new(tmp.path());
    let read = reopened
        .get("/data/AccountChangeEvent")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read.as_bytes(), b"tok1");
}

#[tokio::test]
async fn test_filesystem_set_leaves_only_cursor_files() {
    let temp_dir = TempDir::new().unwrap();
    let store = FilesystemStore::new(temp_dir.path().join("cursors"));

    store.set("/event/A__e", &token(b"a1")).await.unwrap();
    store.set("/event/A__e", &token(b"a2")).await.unwrap();
    store.set("/event/B__e", &token(b"b1")).await.unwrap();

    let mut names: Vec<_> = std::fs::read_dir(store.dir())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    names.sort();
    let mut expected = vec![store.path_for("/event/A__e"), store.path_for("/event/B__e")];
    expected.sort();
    assert_eq!(names, expected);
}

#[cfg(unix)]
#[test]
fn test_sync_dir() {
    let temp_dir = TempDir::new().unwrap();
    crate::filesystem::sync_dir(temp_dir.path()).unwrap();
    assert!(crate::filesystem::sync_dir(&temp_dir.path().join("missing")).is_err());
}

#[tokio::test]
async fn test_filesystem_corrupt_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let store = FilesystemStore::new(tmp.path());

    std::fs::write(store.path_for("/event/Foo__e"), "{ not json").unwrap();

    let result = store.get("/event/Foo__e").await;
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Corrupt cursor file"));
}

#[tokio::test]
async fn test_filesystem_topic_mismatch_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let store = FilesystemStore::new(tmp.path());

    let stored = StoredCursor::new("/event/Other__e", &token(b"tok1"));
    std::fs::write(
        store.path_for("/event/Foo__e"),
        serde_json::to_string(&stored).unwrap(),
    )
    .unwrap();

    let err = store.get("/event/Foo__e").await.unwrap_err().to_string();
    assert!(err.contains("belongs to topic '/event/Other__e'"));
}

#[tokio::test]
async fn test_filesystem_concurrent_writes_never_tear() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(FilesystemStore::new(tmp.path()));
    let topic = "/event/Foo__e";

    // distinct lengths make a torn write detectable
    let candidates: Vec<Vec<u8>> = (1..=16u8).map(|n| vec![n; n as usize * 7]).collect();
    store.set(topic, &token(&candidates[0])).await.unwrap();

    let mut writers = Vec::new();
    for bytes in candidates.clone() {
        let store = Arc::clone(&store);
        writers.push(tokio::spawn(async move {
            for _ in 0..5 {
                store.set(topic, &token(&bytes)).await.unwrap();
            }
        }));
    }

    let reader = {
        let store = Arc::clone(&store);
        let candidates = candidates.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                let read = store.get(topic).await.unwrap().unwrap();
                assert!(
                    candidates.iter().any(|c| c.as_slice() == read.as_bytes()),
                    "observed a value that was never written: {read:?}"
                );
                tokio::task::yield_now().await;
            }
        })
    };

    for writer in writers {
        writer.await.unwrap();
    }
    reader.await.unwrap();

    let last = store.get(topic).await.unwrap().unwrap();
    assert!(candidates.iter().any(|c| c.as_slice() == last.as_bytes()));
}

// ============================================================================
// MemoryStore Tests
// ============================================================================

#[tokio::test]
async fn test_memory_store_roundtrip() {
    let store = MemoryStore::new();
    assert!(store.get("T").await.unwrap().is_none());

    store.set("T", &token(b"tok1")).await.unwrap();
    assert_eq!(store.get("T").await.unwrap().unwrap().as_bytes(), b"tok1");
    assert!(store.get("U").await.unwrap().is_none());
}

// ============================================================================
// CursorStorage Tests
// ============================================================================

#[test]
fn test_cursor_storage_default() {
    let storage = CursorStorage::default();
    assert!(matches!(
        storage,
        CursorStorage::Filesystem { ref dir } if dir == "data"
    ));
    assert!(storage.is_durable());
    assert!(!CursorStorage::Memory.is_durable());
}

#[tokio::test]
async fn test_cursor_storage_open_filesystem() {
    let tmp = TempDir::new().unwrap();
    let storage = CursorStorage::Filesystem {
        dir: tmp.path().to_string_lossy().to_string(),
    };

    let store = storage.open();
    store.set("T", &token(b"tok1")).await.unwrap();

    let direct = FilesystemStore::new(tmp.path());
    assert_eq!(direct.get("T").await.unwrap().unwrap().as_bytes(), b"tok1");
}
