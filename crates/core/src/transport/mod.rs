//! Transport abstraction layer
//!
//! A transport delivers encoded protocol messages between a client and a
//! server. The client core is polymorphic over [`RomTransport`]: swapping
//! the in-process [`LocalTransport`] for a networked implementation changes
//! no caller-visible behavior except latency and failure modes.
//!
//! # Thread safety
//!
//! Implementations must be Send + Sync; multiple tasks may issue calls
//! concurrently and wait on independent correlation ids.

use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;

use crate::protocol::{EventNotification, Request, Response};
use crate::Result;

pub mod local;

pub use local::LocalTransport;

/// Sink receiving server-originated notifications on the client side.
///
/// Transports push into it from their read path; the channel is unbounded so
/// a slow consumer can never stall response matching.
pub type NotificationSink = mpsc::UnboundedSender<EventNotification>;

/// Transport flavor, for logs and configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// In-process dispatch, used for deterministic tests
    Local,
    /// Framed messages over a TCP connection
    Tcp,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Local => write!(f, "local"),
            TransportKind::Tcp => write!(f, "tcp"),
        }
    }
}

/// Pluggable delivery mechanism for protocol messages
#[async_trait]
pub trait RomTransport: Send + Sync {
    /// Deliver a request and wait for its correlated response.
    ///
    /// # Errors
    ///
    /// * `Error::Transport` - connection lost before or while waiting
    /// * `Error::Timeout` - no response within the transport's bound
    /// * `Error::Protocol` - the peer sent something undecodable in reply
    async fn call(&self, request: Request) -> Result<Response>;

    /// Register the sink inbound notifications are pushed into.
    ///
    /// Called once by the client during setup, before any subscription is
    /// made. Notifications arriving before registration are dropped.
    fn set_notification_sink(&self, sink: NotificationSink);

    /// Which flavor of transport this is.
    fn kind(&self) -> TransportKind;

    /// Whether the underlying connection is still usable.
    fn is_connected(&self) -> bool;

    /// Tear the connection down. Pending calls fail with `Error::Transport`.
    async fn close(&self) -> Result<()>;
}
