//! sled-backed storage
//!
//! An embedded LSM-style engine with serializable transactions and crash
//! recovery. One `Db` handle is opened per process and cloned cheaply into
//! every caller.

use std::path::Path;

use sled::transaction::{ConflictableTransactionResult, TransactionError, TransactionalTree};
use sled::Db;

use super::{Storage, StorageResult};
use crate::config::SyncStrategy;
use crate::error::StorageError;

/// Storage facade over a sled database
#[derive(Clone)]
pub struct SledStorage {
    db: Db,
    sync: SyncStrategy,
}

impl SledStorage {
    /// Open or create a database at `path`
    pub fn open(path: &Path, sync: SyncStrategy) -> StorageResult<Self> {
        let flush_every_ms = match sync {
            SyncStrategy::EveryWrite => None,
            SyncStrategy::Periodic { interval_ms } => Some(interval_ms),
        };
        let db = sled::Config::new()
            .path(path)
            .flush_every_ms(flush_every_ms)
            .open()?;
        Ok(Self { db, sync })
    }

    /// A database removed when the last handle is dropped
    pub fn temporary() -> StorageResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self {
            db,
            sync: SyncStrategy::EveryWrite,
        })
    }

    /// Run `op` in a write scope, then apply the sync strategy
    fn write_scope<F>(&self, op: F) -> StorageResult<()>
    where
        F: Fn(&TransactionalTree) -> ConflictableTransactionResult<(), StorageError>,
    {
        self.db.transaction(op).map_err(from_transaction_error)?;
        if self.sync == SyncStrategy::EveryWrite {
            self.db.flush()?;
        }
        Ok(())
    }
}

fn from_transaction_error(err: TransactionError<StorageError>) -> StorageError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => StorageError::Engine(e),
    }
}

impl Storage for SledStorage {
    fn set(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.write_scope(|tx| {
            tx.insert(key, value)?;
            Ok(())
        })
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let result: Result<Option<Vec<u8>>, TransactionError<StorageError>> =
            self.db.transaction(|tx| Ok(tx.get(key)?.map(|value| value.to_vec())));
        result.map_err(from_transaction_error)
    }

    fn delete(&self, key: &[u8]) -> StorageResult<()> {
        self.write_scope(|tx| {
            tx.remove(key)?;
            Ok(())
        })
    }

    fn close(&self) -> StorageResult<()> {
        let flushed = self.db.flush()?;
        tracing::debug!("Flushed {} bytes on close", flushed);
        Ok(())
    }
}
