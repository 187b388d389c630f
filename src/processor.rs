//! Command Processor
//!
//! The single authorization gate between parsed commands and storage.
//!
//! ## Per-command flow
//! ```text
//! name ──► known? ──no──► UnsupportedCommand
//!            │yes
//!            ▼
//!        arity ok? ──no──► MalformedCommand
//!            │yes
//!            ▼
//!      args tokens? ──no──► MalformedCommand
//!            │yes
//!            ▼
//!      permission? ──no──► PermissionDenied
//!            │yes
//!            ▼
//!     Storage Facade ──► OK / value / NotFound / StorageError
//! ```
//!
//! Every rejection happens before storage is touched, so a denied caller
//! learns nothing about which keys exist. The processor holds no per-call
//! state and is shared by all connection workers.

use std::sync::Arc;

use crate::auth::{has_permission, User};
use crate::error::{CommandError, StorageError};
use crate::protocol::{is_token, Command, CommandKind, Outcome, Reply};
use crate::storage::Storage;

/// Stateless authorization + dispatch over a shared storage handle
#[derive(Clone)]
pub struct CommandProcessor {
    storage: Arc<dyn Storage>,
}

impl CommandProcessor {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// The storage handle commands are dispatched to
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Execute `command` on behalf of `identity` (`None` = anonymous)
    pub fn execute(&self, identity: Option<&User>, command: &Command) -> Outcome {
        let kind = command
            .kind()
            .ok_or_else(|| CommandError::UnsupportedCommand(command.name.clone()))?;

        if command.args.len() != kind.arity() {
            return Err(CommandError::MalformedCommand(format!(
                "{} takes {} argument(s), got {} (usage: {})",
                kind,
                kind.arity(),
                command.args.len(),
                kind.usage()
            )));
        }

        // Arguments obey the wire token rules, adapter included
        if let Some(arg) = command.args.iter().find(|arg| !is_token(arg)) {
            return Err(CommandError::MalformedCommand(format!(
                "argument {:?} is empty or contains whitespace (usage: {})",
                String::from_utf8_lossy(arg),
                kind.usage()
            )));
        }

        if let Some(capability) = kind.required_capability() {
            if !has_permission(identity, capability) {
                tracing::warn!(
                    user = identity.map_or("<anonymous>", |u| u.username.as_str()),
                    command = kind.name(),
                    %capability,
                    "Permission denied"
                );
                return Err(CommandError::PermissionDenied {
                    command: kind.name(),
                    capability,
                });
            }
        }

        self.dispatch(kind, command).map_err(|e| {
            tracing::error!(command = kind.name(), "Storage failure: {}", e);
            CommandError::Storage(e)
        })
    }

    /// Run an authorized, well-formed command against storage
    fn dispatch(&self, kind: CommandKind, command: &Command) -> Result<Reply, StorageError> {
        let args = &command.args;
        match kind {
            CommandKind::Set => {
                self.storage.set(&args[0], &args[1])?;
                Ok(Reply::Ok)
            }
            CommandKind::Get => Ok(match self.storage.get(&args[0])? {
                Some(value) => Reply::Value(value),
                None => Reply::NotFound,
            }),
            CommandKind::Delete => {
                self.storage.delete(&args[0])?;
                Ok(Reply::Ok)
            }
            CommandKind::Ping => Ok(Reply::Pong),
        }
    }
}
