//! Response definitions
//!
//! Represents the successful outcomes of a command.

use crate::error::CommandError;

/// Marker line sent when GET misses
pub const NOT_FOUND_MARKER: &[u8] = b"NotFound";

/// Error kind sent to connections refused at capacity
pub const CONNECTION_LIMIT: &str = "ConnectionLimit";

/// A successful command result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Write or delete committed
    Ok,

    /// Value read for a key
    Value(Vec<u8>),

    /// The key does not exist
    NotFound,

    /// Answer to PING
    Pong,
}

impl Reply {
    /// The value bytes, if this is a read hit
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Reply::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// What the processor hands back for every command
pub type Outcome = std::result::Result<Reply, CommandError>;
