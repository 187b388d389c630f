//! Connection Handler
//!
//! Handles individual client connections.
//!
//! ```text
//! Open ──► ReadCommand ──► Dispatch ──► WriteResponse ──┐
//!              ▲                                        │
//!              └────────────────────────────────────────┘
//!              │ EOF / read error / write error
//!              ▼
//!           Closed
//! ```

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::{CommandError, GateError, Result};
use crate::network::Session;
use crate::processor::CommandProcessor;
use crate::protocol::{parse_line, read_line, write_outcome, Outcome};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Shared authorization + dispatch gate
    processor: CommandProcessor,

    /// Peer address and bound identity
    session: Session,

    /// Longest accepted command line
    max_line_bytes: usize,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(
        stream: TcpStream,
        processor: CommandProcessor,
        session: Session,
        max_line_bytes: usize,
    ) -> Result<Self> {
        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            processor,
            session,
            max_line_bytes,
        })
    }

    /// Configure connection timeouts; 0 leaves a direction unbounded
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Commands are answered strictly in the order they arrive. Returns when
    /// the client disconnects, goes idle past the read timeout, or the
    /// stream fails.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!(
            "Connection {} established from {} as {}",
            self.session.id(),
            self.session.peer_addr(),
            self.session.username()
        );

        loop {
            let line = match read_line(&mut self.reader, self.max_line_bytes) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::debug!("Client {} disconnected", self.session.peer_addr());
                    return Ok(());
                }
                Err(GateError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Connection to {} closed: {}", self.session.peer_addr(), e);
                    return Ok(());
                }
                Err(GateError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    // Idle past the read timeout (Windows reports TimedOut)
                    tracing::debug!("Read timeout for client {}", self.session.peer_addr());
                    return Ok(());
                }
                Err(GateError::Protocol(msg)) => {
                    tracing::warn!("Dropping {}: {}", self.session.peer_addr(), msg);
                    let _ = self.send(&Err(CommandError::MalformedCommand(msg.clone())));
                    return Err(GateError::Protocol(msg));
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.session.peer_addr(), e);
                    return Err(e);
                }
            };

            let Some(command) = parse_line(&line) else {
                tracing::debug!("Ignoring blank line from {}", self.session.peer_addr());
                continue;
            };

            tracing::trace!(
                "Received {} with {} argument(s) from {}",
                command.name,
                command.args.len(),
                self.session.peer_addr()
            );

            let outcome = self.processor.execute(self.session.identity(), &command);

            if let Err(e) = self.send(&outcome) {
                if let GateError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.session.peer_addr(),
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.session.peer_addr(), e);
                return Err(e);
            }
        }
    }

    fn send(&mut self, outcome: &Outcome) -> Result<()> {
        write_outcome(&mut self.writer, outcome)
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
    )
}
