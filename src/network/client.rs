//! Blocking line-protocol client

use std::io::{BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{GateError, Result};
use crate::protocol::{decode_reply, read_line, write_command, Command, ReplyLine};

/// Longest response line the client accepts (16 MB)
const MAX_REPLY_BYTES: usize = 16 * 1024 * 1024;

/// A connection to a kvgate server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Bound how long a reply may take
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Send a command and read its reply line
    pub fn send(&mut self, command: &Command) -> Result<ReplyLine> {
        write_command(&mut self.writer, command)?;
        self.read_reply()
    }

    /// Send raw bytes as one line (a `\n` is appended) and read the reply
    pub fn send_line(&mut self, line: &[u8]) -> Result<ReplyLine> {
        self.writer.write_all(line)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.read_reply()
    }

    /// Read one reply line without sending anything
    pub fn read_reply(&mut self) -> Result<ReplyLine> {
        match read_line(&mut self.reader, MAX_REPLY_BYTES)? {
            Some(line) => Ok(decode_reply(&line)),
            None => Err(GateError::Connection("server closed the connection".into())),
        }
    }

    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        match self.send(&Command::from_parts("SET", [key, value]))? {
            ReplyLine::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// `Ok(None)` when the key does not exist
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.send(&Command::from_parts("GET", [key]))? {
            ReplyLine::Value(value) => Ok(Some(value)),
            ReplyLine::NotFound => Ok(None),
            other => Err(unexpected(other)),
        }
    }

    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        match self.send(&Command::from_parts("DELETE", [key]))? {
            ReplyLine::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub fn ping(&mut self) -> Result<()> {
        match self.send(&Command::from_parts("PING", Vec::<&[u8]>::new()))? {
            ReplyLine::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(reply: ReplyLine) -> GateError {
    match reply {
        ReplyLine::Error { kind, detail } => GateError::Remote { kind, detail },
        other => GateError::Protocol(format!("unexpected reply {:?}", other)),
    }
}
