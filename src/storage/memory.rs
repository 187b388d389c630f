//! In-memory storage
//!
//! BTreeMap behind a RwLock. Nothing survives the process, so this backend
//! suits ephemeral deployments and tests. It counts every facade call and
//! can be told to fail, which lets callers observe exactly when storage is
//! (and is not) reached.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::{Storage, StorageResult};
use crate::error::StorageError;

/// Volatile storage facade
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set`/`get`/`delete` calls received so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail with `StorageError::Unavailable`
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    fn enter(&self) -> StorageResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory engine is offline".into()));
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn set(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.enter()?;
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.enter()?;
        Ok(self.data.read().get(key).cloned())
    }

    fn delete(&self, key: &[u8]) -> StorageResult<()> {
        self.enter()?;
        self.data.write().remove(key);
        Ok(())
    }
}
