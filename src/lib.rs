//! # kvgate
//!
//! A permission-gated command front-end for an embedded key-value engine:
//! - Line-oriented TCP protocol (`SET`, `GET`, `DELETE`, `PING`)
//! - Per-user capabilities (`read`, `write`, `delete`), checked in one place
//! - Command adapter for client-library integrations
//! - Durable storage through sled transactions
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                             │
//! │            (one worker thread per connection)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  line ──► Command      ┌──────────────┐
//!                       │                        │CommandAdapter│
//! ┌─────────────────────▼────────────────────────┴──────┬───────┘
//! │                  Command Processor                   │
//! │     (unsupported? ► arity? ► permission? ► dispatch) │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//!              ┌─────────────────┐
//!              │ Storage Facade  │
//!              │ (dyn Storage)   │
//!              └────────┬────────┘
//!                       ▼
//!              ┌─────────────────┐
//!              │   sled::Db      │
//!              └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod auth;
pub mod storage;
pub mod protocol;
pub mod processor;
pub mod adapter;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CommandError, GateError, Result, StorageError};
pub use config::Config;
pub use auth::{Capability, User};
pub use processor::CommandProcessor;
pub use adapter::{AdapterCommand, CommandAdapter};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kvgate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
