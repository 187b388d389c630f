//! Command definitions
//!
//! Represents commands from clients.

use std::fmt;

use bytes::Bytes;

use crate::auth::Capability;

/// The commands the server understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Set,
    Get,
    Delete,
    Ping,
}

impl CommandKind {
    /// Match a command name, ignoring ASCII case
    pub fn lookup(name: &str) -> Option<Self> {
        [Self::Set, Self::Get, Self::Delete, Self::Ping]
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// Canonical upper-case name
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Set => "SET",
            CommandKind::Get => "GET",
            CommandKind::Delete => "DELETE",
            CommandKind::Ping => "PING",
        }
    }

    /// Capability the caller must hold, if any
    pub fn required_capability(&self) -> Option<Capability> {
        match self {
            CommandKind::Set => Some(Capability::Write),
            CommandKind::Get => Some(Capability::Read),
            CommandKind::Delete => Some(Capability::Delete),
            CommandKind::Ping => None,
        }
    }

    /// Exact number of arguments accepted
    pub fn arity(&self) -> usize {
        match self {
            CommandKind::Set => 2,
            CommandKind::Get | CommandKind::Delete => 1,
            CommandKind::Ping => 0,
        }
    }

    /// Usage string shown in `MalformedCommand` responses
    pub fn usage(&self) -> &'static str {
        match self {
            CommandKind::Set => "SET key value",
            CommandKind::Get => "GET key",
            CommandKind::Delete => "DELETE key",
            CommandKind::Ping => "PING",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed command: name plus positional byte-string arguments
///
/// Built fresh for every received line and dropped after dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<Bytes>,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<Bytes>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Convenience constructor from string-like arguments
    pub fn from_parts<I, A>(name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: AsRef<[u8]>,
    {
        Self::new(
            name,
            args.into_iter()
                .map(|a| Bytes::copy_from_slice(a.as_ref()))
                .collect(),
        )
    }

    /// Build a command from line tokens; `None` for an empty token list
    pub fn from_tokens(mut tokens: Vec<Bytes>) -> Option<Self> {
        if tokens.is_empty() {
            return None;
        }
        let args = tokens.split_off(1);
        let name = String::from_utf8_lossy(&tokens[0]).into_owned();
        Some(Self { name, args })
    }

    /// The recognized kind, if the name is known
    pub fn kind(&self) -> Option<CommandKind> {
        CommandKind::lookup(&self.name)
    }
}
