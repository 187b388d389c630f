//! Protocol Module
//!
//! Defines the line protocol spoken between clients and the server.
//!
//! ## Request Format
//! ```text
//! ┌──────────┬───┬──────────┬───┬──────────┬────┐
//! │   NAME   │ ␠ │  ARG 1   │ ␠ │  ARG n   │ \n │
//! └──────────┴───┴──────────┴───┴──────────┴────┘
//! ```
//! Tokens are separated by ASCII whitespace and carried as raw bytes.
//! A trailing `\r` is ignored. Command names are case-insensitive.
//!
//! ### Commands
//! - `SET key value`  - requires `write`
//! - `GET key`        - requires `read`
//! - `DELETE key`     - requires `delete`
//! - `PING`           - requires nothing
//!
//! ## Response Format
//! One line per command:
//! - `OK`                   - SET / DELETE succeeded
//! - `<value>`              - GET hit
//! - `NotFound`             - GET miss
//! - `PONG`                 - PING
//! - `<Kind>[: <detail>]`   - error, Kind is `PermissionDenied`,
//!   `MalformedCommand`, `UnsupportedCommand`, `StorageError` or
//!   `ConnectionLimit`

mod codec;
mod command;
mod response;

pub use codec::{
    decode_reply, encode_command, encode_outcome, is_token, parse_line, read_line, tokenize,
    write_command, write_outcome, ReplyLine,
};
pub use command::{Command, CommandKind};
pub use response::{Outcome, Reply, CONNECTION_LIMIT, NOT_FOUND_MARKER};
