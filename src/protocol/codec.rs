//! Protocol codec
//!
//! Line framing, tokenization and response encoding.
//!
//! ## Framing
//! ```text
//! bytes ──► read_line ──► tokenize ──► Command
//!                (\n, strip \r)   (ASCII whitespace)
//!
//! Outcome ──► encode_outcome ──► one line ──► stream
//! ```

use std::io::{BufRead, Read, Write};

use bytes::Bytes;

use super::response::{CONNECTION_LIMIT, NOT_FOUND_MARKER};
use super::{Command, Outcome, Reply};
use crate::error::{GateError, Result};

/// Error kinds that may open a response line
const ERROR_KINDS: [&str; 5] = [
    "PermissionDenied",
    "MalformedCommand",
    "UnsupportedCommand",
    "StorageError",
    CONNECTION_LIMIT,
];

// =============================================================================
// Request Side
// =============================================================================

/// Read one line, without its terminator
///
/// Returns `Ok(None)` at end of input. A final line without `\n` is still
/// returned. Lines longer than `max_len` are a protocol error; the rest of
/// the stream cannot be trusted after that.
pub fn read_line<R: BufRead>(reader: &mut R, max_len: usize) -> Result<Option<Bytes>> {
    let mut buf = Vec::new();
    let limit = max_len as u64 + 2;
    let read = reader.by_ref().take(limit).read_until(b'\n', &mut buf)?;
    if read == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if read as u64 == limit {
        return Err(GateError::Protocol(format!(
            "line exceeds {} bytes",
            max_len
        )));
    }

    if buf.len() > max_len {
        return Err(GateError::Protocol(format!(
            "line exceeds {} bytes",
            max_len
        )));
    }

    Ok(Some(Bytes::from(buf)))
}

/// Split a line on ASCII whitespace; tokens share the line's buffer
pub fn tokenize(line: &Bytes) -> Vec<Bytes> {
    let mut tokens = Vec::new();
    let mut start = None;

    for (i, byte) in line.iter().enumerate() {
        match (byte.is_ascii_whitespace(), start) {
            (true, Some(s)) => {
                tokens.push(line.slice(s..i));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push(line.slice(s..));
    }

    tokens
}

/// Parse a line into a command; `None` for a blank line
pub fn parse_line(line: &Bytes) -> Option<Command> {
    Command::from_tokens(tokenize(line))
}

/// Encode a command as a request line
///
/// Fails if any token is empty or contains whitespace, since the line
/// format cannot carry it.
pub fn encode_command(command: &Command) -> Result<Vec<u8>> {
    let mut line = Vec::with_capacity(
        command.name.len() + command.args.iter().map(|a| a.len() + 1).sum::<usize>() + 1,
    );

    check_token(command.name.as_bytes())?;
    line.extend_from_slice(command.name.as_bytes());
    for arg in &command.args {
        check_token(arg)?;
        line.push(b' ');
        line.extend_from_slice(arg);
    }
    line.push(b'\n');

    Ok(line)
}

/// True when `token` survives tokenization unchanged
pub fn is_token(token: &[u8]) -> bool {
    !token.is_empty() && !token.iter().any(u8::is_ascii_whitespace)
}

fn check_token(token: &[u8]) -> Result<()> {
    if !is_token(token) {
        return Err(GateError::Protocol(format!(
            "token {:?} cannot be sent on the line protocol",
            String::from_utf8_lossy(token)
        )));
    }
    Ok(())
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Response Side
// =============================================================================

/// Encode a command outcome as one response line
///
/// A value holding a line break cannot be framed; it is reported as a
/// `StorageError` line instead of being written raw.
pub fn encode_outcome(outcome: &Outcome) -> Vec<u8> {
    let mut line = match outcome {
        Ok(Reply::Ok) => b"OK".to_vec(),
        Ok(Reply::Value(value)) if value.iter().any(|b| *b == b'\r' || *b == b'\n') => {
            error_line(
                "StorageError",
                &format!("stored value of {} bytes spans multiple lines", value.len()),
            )
        }
        Ok(Reply::Value(value)) => value.clone(),
        Ok(Reply::NotFound) => NOT_FOUND_MARKER.to_vec(),
        Ok(Reply::Pong) => b"PONG".to_vec(),
        Err(e) => error_line(e.kind(), &e.to_string()),
    };
    line.push(b'\n');
    line
}

/// `<Kind>: <detail>` with line breaks flattened
pub(crate) fn error_line(kind: &str, detail: &str) -> Vec<u8> {
    let detail = detail.replace(|c: char| c == '\r' || c == '\n', " ");
    format!("{}: {}", kind, detail).into_bytes()
}

/// Write an outcome to a stream
pub fn write_outcome<W: Write>(writer: &mut W, outcome: &Outcome) -> Result<()> {
    writer.write_all(&encode_outcome(outcome))?;
    writer.flush()?;
    Ok(())
}

/// A response line as seen by a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyLine {
    Ok,
    Pong,
    NotFound,
    Value(Vec<u8>),
    Error { kind: String, detail: String },
}

/// Classify a response line (terminator already removed)
///
/// Markers take precedence, so a stored value that equals a marker or
/// starts with an error kind cannot be told apart from it.
pub fn decode_reply(line: &[u8]) -> ReplyLine {
    match line {
        b"OK" => return ReplyLine::Ok,
        b"PONG" => return ReplyLine::Pong,
        _ if line == NOT_FOUND_MARKER => return ReplyLine::NotFound,
        _ => {}
    }

    for kind in ERROR_KINDS {
        let Some(rest) = line.strip_prefix(kind.as_bytes()) else {
            continue;
        };
        if rest.is_empty() {
            return ReplyLine::Error {
                kind: kind.to_string(),
                detail: String::new(),
            };
        }
        if let Some(detail) = rest.strip_prefix(b": ") {
            return ReplyLine::Error {
                kind: kind.to_string(),
                detail: String::from_utf8_lossy(detail).into_owned(),
            };
        }
    }

    ReplyLine::Value(line.to_vec())
}
