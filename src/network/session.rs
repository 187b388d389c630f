//! Connection Session
//!
//! Per-connection state: who is on the other end and as whom they act.

use std::sync::Arc;

use crate::auth::User;

/// State owned by one connection worker
#[derive(Debug, Clone)]
pub struct Session {
    id: u64,
    peer_addr: String,
    identity: Option<Arc<User>>,
}

impl Session {
    pub fn new(id: u64, peer_addr: impl Into<String>, identity: Option<Arc<User>>) -> Self {
        Self {
            id,
            peer_addr: peer_addr.into(),
            identity,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// The bound identity; `None` means anonymous
    pub fn identity(&self) -> Option<&User> {
        self.identity.as_deref()
    }

    /// Name for log lines
    pub fn username(&self) -> &str {
        self.identity().map_or("<anonymous>", |u| u.username.as_str())
    }
}
