//! Byte-level transport collaborator.
//!
//! The engine talks to the link exclusively through [`Transport`]: one
//! request written, then one byte read at a time until a boundary is
//! recognised. A [`Dialer`] produces fresh transports for session start and
//! reconnection.

use std::io;

use async_trait::async_trait;

use crate::config::LinkParams;

mod tcp;

pub use tcp::{TcpDialer, TcpTransport};

/// Result of a single byte read.
#[derive(Debug)]
pub enum ReadSignal {
    /// A byte arrived.
    Byte(u8),
    /// No byte arrived within the read timeout.
    Timeout,
    /// The transport failed.
    Error(io::Error),
}

/// A half-duplex, byte-oriented link.
///
/// Implementations must not buffer requests: a write is only issued once the
/// previous response has been fully read or abandoned.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send {
    /// Enter the given mode. Returns false if the link refuses.
    async fn open(&mut self, mode: &str) -> bool;

    /// Send request bytes. Returns false on an unrecoverable send failure.
    async fn write(&mut self, bytes: &[u8]) -> bool;

    /// Read the next byte, waiting at most the configured timeout.
    async fn read_byte(&mut self) -> ReadSignal;

    /// Tear the link down.
    async fn close(&mut self);
}

/// Factory for transports bound to one logical endpoint.
#[cfg_attr(test, mockall::automock(type Transport = MockTransport;))]
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Transport produced by this dialer.
    type Transport: Transport;

    /// Create a transport with the given speed and timeout.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the endpoint cannot be reached.
    async fn dial(&self, params: &LinkParams) -> io::Result<Self::Transport>;
}
