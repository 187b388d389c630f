//! Tests for the Storage Facade
//!
//! These tests verify:
//! - set/get/delete against sled and the in-memory backend
//! - Missing keys come back as `None`, not as errors
//! - Deleting an absent key succeeds
//! - Data survives reopening the sled database
//! - Concurrent writers never produce a mixed value

use std::sync::Arc;
use std::thread;

use kvgate::config::{Config, EngineKind, SyncStrategy};
use kvgate::storage::{self, MemoryStorage, SledStorage, Storage};
use kvgate::StorageError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_sled() -> (TempDir, SledStorage) {
    let temp_dir = TempDir::new().unwrap();
    let storage = SledStorage::open(temp_dir.path(), SyncStrategy::EveryWrite).unwrap();
    (temp_dir, storage)
}

fn backends() -> Vec<(TempDir, Arc<dyn Storage>)> {
    let (temp, sled) = setup_temp_sled();
    vec![
        (temp, Arc::new(sled) as Arc<dyn Storage>),
        (TempDir::new().unwrap(), Arc::new(MemoryStorage::new()) as Arc<dyn Storage>),
    ]
}

// =============================================================================
// Basic Operations
// =============================================================================

#[test]
fn test_set_get() {
    for (_temp, storage) in backends() {
        storage.set(b"hello", b"world").unwrap();
        assert_eq!(storage.get(b"hello").unwrap(), Some(b"world".to_vec()));
    }
}

#[test]
fn test_get_missing_is_none() {
    for (_temp, storage) in backends() {
        assert_eq!(storage.get(b"missing").unwrap(), None);
    }
}

#[test]
fn test_overwrite() {
    for (_temp, storage) in backends() {
        storage.set(b"k", b"one").unwrap();
        storage.set(b"k", b"two").unwrap();
        assert_eq!(storage.get(b"k").unwrap(), Some(b"two".to_vec()));
    }
}

#[test]
fn test_delete_removes_key() {
    for (_temp, storage) in backends() {
        storage.set(b"k", b"v").unwrap();
        storage.delete(b"k").unwrap();
        assert_eq!(storage.get(b"k").unwrap(), None);
    }
}

#[test]
fn test_delete_absent_key_is_idempotent() {
    for (_temp, storage) in backends() {
        storage.delete(b"never-set").unwrap();
        storage.delete(b"never-set").unwrap();
        assert_eq!(storage.get(b"never-set").unwrap(), None);
    }
}

#[test]
fn test_binary_values_round_trip() {
    let value: Vec<u8> = (0u8..=255).collect();
    for (_temp, storage) in backends() {
        storage.set(&[0x00, 0xff], &value).unwrap();
        assert_eq!(storage.get(&[0x00, 0xff]).unwrap(), Some(value.clone()));
    }
}

// =============================================================================
// Durability
// =============================================================================

#[test]
fn test_sled_data_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();

    {
        let storage = SledStorage::open(temp_dir.path(), SyncStrategy::EveryWrite).unwrap();
        storage.set(b"persisted", b"yes").unwrap();
        storage.set(b"removed", b"soon").unwrap();
        storage.delete(b"removed").unwrap();
        storage.close().unwrap();
    }

    let storage = SledStorage::open(temp_dir.path(), SyncStrategy::EveryWrite).unwrap();
    assert_eq!(storage.get(b"persisted").unwrap(), Some(b"yes".to_vec()));
    assert_eq!(storage.get(b"removed").unwrap(), None);
}

#[test]
fn test_sled_periodic_flush_survives_close() {
    let temp_dir = TempDir::new().unwrap();
    let sync = SyncStrategy::Periodic { interval_ms: 1000 };

    {
        let storage = SledStorage::open(temp_dir.path(), sync).unwrap();
        storage.set(b"k", b"v").unwrap();
        storage.close().unwrap();
    }

    let storage = SledStorage::open(temp_dir.path(), sync).unwrap();
    assert_eq!(storage.get(b"k").unwrap(), Some(b"v".to_vec()));
}

#[test]
fn test_open_from_config() {
    let temp_dir = TempDir::new().unwrap();

    let config = Config::builder()
        .data_dir(temp_dir.path().join("db"))
        .engine(EngineKind::Sled)
        .build();
    let sled = storage::open(&config).unwrap();
    sled.set(b"k", b"v").unwrap();
    assert!(temp_dir.path().join("db").exists());

    let config = Config::builder().engine(EngineKind::Memory).build();
    let memory = storage::open(&config).unwrap();
    assert_eq!(memory.get(b"k").unwrap(), None);
}

// =============================================================================
// Failure Reporting
// =============================================================================

#[test]
fn test_memory_failure_is_surfaced() {
    let storage = MemoryStorage::new();
    storage.set_failing(true);

    assert!(matches!(
        storage.set(b"k", b"v"),
        Err(StorageError::Unavailable(_))
    ));
    assert!(matches!(storage.get(b"k"), Err(StorageError::Unavailable(_))));
    assert!(matches!(storage.delete(b"k"), Err(StorageError::Unavailable(_))));
    assert_eq!(storage.call_count(), 3);
    assert!(storage.is_empty());
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_writers_distinct_keys() {
    let (_temp, storage) = setup_temp_sled();
    let storage = Arc::new(storage);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let storage = Arc::clone(&storage);
            thread::spawn(move || {
                for i in 0..50 {
                    let key = format!("t{}-k{}", t, i);
                    storage.set(key.as_bytes(), key.as_bytes()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for t in 0..4 {
        for i in 0..50 {
            let key = format!("t{}-k{}", t, i);
            assert_eq!(storage.get(key.as_bytes()).unwrap(), Some(key.into_bytes()));
        }
    }
}

#[test]
fn test_concurrent_writers_same_key_last_commit_wins() {
    let (_temp, storage) = setup_temp_sled();
    let storage = Arc::new(storage);
    let a = vec![b'a'; 4096];
    let b = vec![b'b'; 4096];

    let handles: Vec<_> = [a.clone(), b.clone()]
        .into_iter()
        .map(|value| {
            let storage = Arc::clone(&storage);
            thread::spawn(move || {
                for _ in 0..100 {
                    storage.set(b"shared", &value).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stored = storage.get(b"shared").unwrap().unwrap();
    assert!(stored == a || stored == b, "value was a mixture of both writers");
}
