//! Command Adapter
//!
//! Entry point for client-library integrations that hand over named
//! commands with string arguments instead of raw protocol lines.
//!
//! Commands go through the same [`CommandProcessor`] gate as network
//! traffic, so the permission rules and error taxonomy are identical. The
//! caller's identity is passed explicitly on every call.
//!
//! ```text
//! AdapterCommand("GET", ["k"]) ──► CommandAdapter::process(identity, ..)
//!                                        │
//!                                        ▼
//!                                 CommandProcessor
//!                                        │
//!            cmd.val() = value ◄─────────┘──► Err(CommandError)
//! ```

use bytes::Bytes;

use crate::auth::User;
use crate::error::CommandError;
use crate::processor::CommandProcessor;
use crate::protocol::{Command, Outcome, Reply};

/// A named command with positional string arguments and a result slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterCommand {
    name: String,
    args: Vec<String>,
    reply: Option<Reply>,
}

impl AdapterCommand {
    pub fn new<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
            reply: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The reply stored by the last successful `process`
    pub fn reply(&self) -> Option<&Reply> {
        self.reply.as_ref()
    }

    /// Value set by a read command
    pub fn val(&self) -> Option<&[u8]> {
        self.reply.as_ref().and_then(Reply::value)
    }

    /// Value set by a read command, decoded as UTF-8 (lossy)
    pub fn val_string(&self) -> Option<String> {
        self.val().map(|v| String::from_utf8_lossy(v).into_owned())
    }

    /// True when a read command found no value
    pub fn is_nil(&self) -> bool {
        matches!(self.reply, Some(Reply::NotFound))
    }

    fn to_command(&self) -> Command {
        Command::new(
            self.name.clone(),
            self.args
                .iter()
                .map(|a| Bytes::copy_from_slice(a.as_bytes()))
                .collect(),
        )
    }
}

/// Runs adapter commands through the command processor
#[derive(Clone)]
pub struct CommandAdapter {
    processor: CommandProcessor,
}

impl CommandAdapter {
    pub fn new(processor: CommandProcessor) -> Self {
        Self { processor }
    }

    /// Process one command, storing its reply on success
    pub fn process(&self, identity: Option<&User>, cmd: &mut AdapterCommand) -> Result<(), CommandError> {
        cmd.reply = None;
        let reply = self.processor.execute(identity, &cmd.to_command())?;
        cmd.reply = Some(reply);
        Ok(())
    }

    /// Process commands in order, stopping at the first error
    ///
    /// Commands before the failing one keep their replies; commands after
    /// it are left untouched.
    pub fn process_pipeline(
        &self,
        identity: Option<&User>,
        cmds: &mut [AdapterCommand],
    ) -> Result<(), CommandError> {
        for cmd in cmds.iter_mut() {
            self.process(identity, cmd)?;
        }
        Ok(())
    }
}

/// Render an outcome as a RESP frame
///
/// `+OK`, `+PONG`, a bulk string for values, the nil bulk string for a
/// missing key, and `-<Kind> <detail>` for errors.
pub fn encode_resp(outcome: &Outcome) -> Vec<u8> {
    match outcome {
        Ok(Reply::Ok) => b"+OK\r\n".to_vec(),
        Ok(Reply::Pong) => b"+PONG\r\n".to_vec(),
        Ok(Reply::NotFound) => b"$-1\r\n".to_vec(),
        Ok(Reply::Value(value)) => {
            let mut frame = format!("${}\r\n", value.len()).into_bytes();
            frame.extend_from_slice(value);
            frame.extend_from_slice(b"\r\n");
            frame
        }
        Err(e) => {
            let detail = e.to_string().replace(|c: char| c == '\r' || c == '\n', " ");
            format!("-{} {}\r\n", e.kind(), detail).into_bytes()
        }
    }
}
