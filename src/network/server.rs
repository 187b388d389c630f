//! TCP Server
//!
//! Accepts connections and hands each one to its own worker thread.

use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::sync::WaitGroup;
use parking_lot::Mutex;

use crate::auth::User;
use crate::config::Config;
use crate::error::{GateError, Result};
use crate::network::{Connection, Session};
use crate::processor::CommandProcessor;
use crate::protocol::CONNECTION_LIMIT;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Live connection streams by connection id
type Registry = Arc<Mutex<HashMap<u64, TcpStream>>>;

/// TCP server for kvgate
pub struct Server {
    config: Config,
    processor: CommandProcessor,

    /// Identity bound to every accepted connection
    identity: Option<Arc<User>>,

    listener: Option<TcpListener>,
    connections: Registry,
    shutdown: Arc<AtomicBool>,
    next_id: AtomicU64,
}

/// Cloneable handle that stops a running server
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    connections: Registry,
}

impl ShutdownHandle {
    /// Stop accepting and close every live connection stream
    ///
    /// Pending reads return end-of-input; a storage call already in flight
    /// finishes before its worker notices.
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
        for stream in self.connections.lock().values() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Removes a connection from the registry when its worker exits
struct Registration {
    id: u64,
    connections: Registry,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.connections.lock().remove(&self.id);
    }
}

impl Server {
    /// Create a new server; the connection identity is resolved from `config`
    pub fn new(config: Config, processor: CommandProcessor) -> Result<Self> {
        config.validate()?;
        let directory = config.user_directory()?;
        let identity = config.default_identity(&directory)?;

        Ok(Self {
            config,
            processor,
            identity,
            listener: None,
            connections: Arc::new(Mutex::new(HashMap::new())),
            shutdown: Arc::new(AtomicBool::new(false)),
            next_id: AtomicU64::new(1),
        })
    }

    /// Bind the listening socket and return the bound address
    pub fn bind(&mut self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(&self.config.listen_addr)?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        tracing::info!("Listening on {}", addr);
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Address of the bound listener, if bound
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            connections: Arc::clone(&self.connections),
        }
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.connections.lock().len()
    }

    /// Start the server (blocking)
    ///
    /// Binds first if `bind` was not called. Returns after shutdown once
    /// every connection worker has exited.
    pub fn run(&mut self) -> Result<()> {
        if self.listener.is_none() {
            self.bind()?;
        }
        let listener = self
            .listener
            .take()
            .ok_or_else(|| GateError::Connection("listener not bound".into()))?;

        let workers = WaitGroup::new();

        while !self.shutdown.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => self.accept(stream, peer, workers.clone()),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::error!("Error accepting connection: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        drop(listener);
        tracing::info!(
            "Shutting down, waiting for {} connection(s)",
            self.active_connections()
        );
        workers.wait();
        Ok(())
    }

    /// Register an accepted stream and spawn its worker
    fn accept(&self, stream: TcpStream, peer: SocketAddr, worker: WaitGroup) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let registration = match self.register(id, &stream) {
            Ok(Some(registration)) => registration,
            Ok(None) => {
                tracing::warn!(
                    "Rejecting {}: {} connections already open",
                    peer,
                    self.config.max_connections
                );
                let mut stream = stream;
                let _ = writeln!(
                    stream,
                    "{}: server is at capacity ({} connections)",
                    CONNECTION_LIMIT, self.config.max_connections
                );
                return;
            }
            Err(e) => {
                tracing::error!("Failed to register connection from {}: {}", peer, e);
                return;
            }
        };

        let processor = self.processor.clone();
        let session = Session::new(id, peer.to_string(), self.identity.clone());
        let max_line_bytes = self.config.max_line_bytes;
        let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

        let spawned = thread::Builder::new()
            .name(format!("kvgate-conn-{}", id))
            .spawn(move || {
                let _worker = worker;
                let _registration = registration;

                let result = Connection::new(stream, processor, session, max_line_bytes)
                    .and_then(|mut conn| {
                        conn.set_timeouts(read_ms, write_ms)?;
                        conn.handle()
                    });
                if let Err(e) = result {
                    tracing::warn!("Connection {} from {} ended with error: {}", id, peer, e);
                }
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to spawn worker for {}: {}", peer, e);
        }
    }

    /// Track a stream for shutdown; `None` when at capacity
    fn register(&self, id: u64, stream: &TcpStream) -> Result<Option<Registration>> {
        // Accepted sockets may inherit the listener's non-blocking mode
        stream.set_nonblocking(false)?;

        let mut connections = self.connections.lock();
        if connections.len() >= self.config.max_connections {
            return Ok(None);
        }
        let tracked = stream.try_clone()?;

        // A shutdown that already swept the registry would miss this stream
        if self.shutdown.load(Ordering::SeqCst) {
            let _ = tracked.shutdown(Shutdown::Both);
        }
        connections.insert(id, tracked);

        Ok(Some(Registration {
            id,
            connections: Arc::clone(&self.connections),
        }))
    }
}
