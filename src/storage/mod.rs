//! Storage Facade
//!
//! A thin synchronous layer over the embedded key-value engine.
//!
//! ## Responsibilities
//! - Run every call inside the engine's transaction scope
//! - Return owned copies of values, never views into engine memory
//! - Report `NotFound` as `Ok(None)`, separate from failures
//! - Surface every engine failure as [`StorageError`]
//!
//! ## Backends
//! ```text
//! ┌───────────────────────────────┐
//! │      dyn Storage (Arc)        │
//! └──────────────┬────────────────┘
//!         ┌──────┴───────┐
//!         ▼              ▼
//!  ┌─────────────┐ ┌─────────────┐
//!  │ SledStorage │ │MemoryStorage│
//!  │  (durable)  │ │ (volatile)  │
//!  └─────────────┘ └─────────────┘
//! ```
//!
//! No caching happens here: read-after-write behavior is whatever the
//! engine's transactions provide.

mod memory;
mod sled;

use std::sync::Arc;

pub use self::memory::MemoryStorage;
pub use self::sled::SledStorage;

use crate::config::{Config, EngineKind};
use crate::error::StorageError;

/// Result type for facade calls
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Key-value operations the command processor relies on
///
/// Implementations are shared across connection workers, so every method
/// takes `&self` and must be safe to call concurrently.
pub trait Storage: Send + Sync + 'static {
    /// Write `value` under `key` in a write scope and commit
    fn set(&self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Read `key` in a read scope; `None` when the key is absent
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Remove `key` in a write scope; absent keys are not an error
    fn delete(&self, key: &[u8]) -> StorageResult<()>;

    /// Flush pending state before the handle is dropped
    fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Open the backend selected by `config`
///
/// Called once at startup; the returned handle is shared by reference.
pub fn open(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.engine {
        EngineKind::Sled => {
            let storage = SledStorage::open(&config.data_dir, config.sync_strategy)?;
            tracing::info!("Opened sled engine at {}", config.data_dir.display());
            Ok(Arc::new(storage))
        }
        EngineKind::Memory => {
            tracing::info!("Using volatile in-memory engine");
            Ok(Arc::new(MemoryStorage::new()))
        }
    }
}
