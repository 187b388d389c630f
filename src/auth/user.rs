//! Users, capabilities and the user directory

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::GateError;

/// A single grantable operation class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Read,
    Write,
    Delete,
}

impl Capability {
    /// All capabilities, in declaration order
    pub const ALL: [Capability; 3] = [Capability::Read, Capability::Write, Capability::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Read => "read",
            Capability::Write => "write",
            Capability::Delete => "delete",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "read" => Ok(Capability::Read),
            "write" => Ok(Capability::Write),
            "delete" => Ok(Capability::Delete),
            other => Err(GateError::Config(format!("unknown capability '{}'", other))),
        }
    }
}

/// An identity and its granted capabilities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub permissions: HashSet<Capability>,
}

impl User {
    pub fn new(username: impl Into<String>, permissions: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            username: username.into(),
            permissions: permissions.into_iter().collect(),
        }
    }

    /// The administrator of the sample deployment: every capability granted
    pub fn admin() -> Self {
        Self::new("admin", Capability::ALL)
    }

    pub fn has_permission(&self, capability: Capability) -> bool {
        self.permissions.contains(&capability)
    }
}

/// Permission check for a possibly anonymous caller
///
/// `None` behaves as a user with no grants.
pub fn has_permission(identity: Option<&User>, capability: Capability) -> bool {
    identity.is_some_and(|user| user.has_permission(capability))
}

/// Known users by name
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: HashMap<String, Arc<User>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory, rejecting duplicate usernames
    pub fn from_users(users: impl IntoIterator<Item = User>) -> Result<Self, GateError> {
        let mut directory = Self::new();
        for user in users {
            if directory.users.contains_key(&user.username) {
                return Err(GateError::Config(format!(
                    "duplicate user '{}'",
                    user.username
                )));
            }
            directory.users.insert(user.username.clone(), Arc::new(user));
        }
        Ok(directory)
    }

    pub fn get(&self, username: &str) -> Option<Arc<User>> {
        self.users.get(username).cloned()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
