//! Error types for kvgate
//!
//! Three layers:
//! - [`GateError`]: process and connection level failures
//! - [`CommandError`]: the user-visible taxonomy returned by the command processor
//! - [`StorageError`]: failures reported by the storage facade

use thiserror::Error;

use crate::auth::Capability;

/// Result type alias using GateError
pub type Result<T> = std::result::Result<T, GateError>;

/// Unified error type for server, connection and configuration failures
#[derive(Debug, Error)]
pub enum GateError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server answered with an error line
    #[error("Server replied {kind}: {detail}")]
    Remote { kind: String, detail: String },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failures of the storage facade
#[derive(Debug, Error)]
pub enum StorageError {
    /// The engine reported an error (I/O, corruption, closed handle)
    #[error("engine failure: {0}")]
    Engine(#[from] sled::Error),

    /// The backend refused the operation
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a rejected command
///
/// None of these close the connection. `NotFound` is deliberately absent:
/// a missing key is a normal reply, not an error.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{command} requires {capability} permission")]
    PermissionDenied {
        command: &'static str,
        capability: Capability,
    },

    #[error("{0}")]
    MalformedCommand(String),

    #[error("unknown command '{0}'")]
    UnsupportedCommand(String),

    #[error("{0}")]
    Storage(#[from] StorageError),
}

impl CommandError {
    /// Stable wire name of the error, sent as the first token of the response line
    pub fn kind(&self) -> &'static str {
        match self {
            CommandError::PermissionDenied { .. } => "PermissionDenied",
            CommandError::MalformedCommand(_) => "MalformedCommand",
            CommandError::UnsupportedCommand(_) => "UnsupportedCommand",
            CommandError::Storage(_) => "StorageError",
        }
    }
}
