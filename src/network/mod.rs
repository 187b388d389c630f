//! Network Module
//!
//! TCP server, per-connection handling and a blocking client.
//!
//! ## Architecture
//! - Single acceptor thread polling a non-blocking listener
//! - One worker thread per accepted connection
//! - Every command routed through the shared `CommandProcessor`
//! - Live streams registered so shutdown can unblock pending reads

mod client;
mod connection;
mod server;
mod session;

pub use client::Client;
pub use connection::Connection;
pub use server::{Server, ShutdownHandle};
pub use session::Session;
