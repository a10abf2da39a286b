//! Outbound Ports (Driven Ports)
//!
//! The engine depends on exactly one connection, reached through
//! [`Transport`]. Adapters know bytes and lifecycle only: no identifiers, no
//! method or result semantics.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Lifecycle and inbound traffic reported by a transport.
///
/// Delivered on the single channel handed to [`Transport::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection established.
    Open,
    /// Inbound text frame.
    Message(String),
    /// Non-fatal error; a `Close` follows if the connection is gone.
    Error(TransportError),
    /// Connection closed, with the remote's reason if it gave one.
    Close { reason: Option<String> },
}

/// Raw bidirectional connection (Driven Port)
#[async_trait]
pub trait Transport: Send + 'static {
    /// Start connecting. Returns once the attempt is under way; the outcome
    /// arrives as `Open` or `Error`/`Close` on `events`.
    async fn open(&mut self, events: mpsc::Sender<TransportEvent>) -> Result<(), TransportError>;

    /// Write one text frame. Frames are written in call order.
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Close the connection.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Address this transport connects to.
    fn endpoint(&self) -> &str;
}

/// Receives lifecycle notifications (the logging collaborator).
///
/// Every method has a no-op default so observers implement only what they
/// care about.
pub trait EngineObserver: Send + Sync {
    fn on_open(&self, _endpoint: &str) {}

    fn on_close(&self, _reason: Option<&str>) {}

    fn on_error(&self, _error: &TransportError) {}

    fn on_frame_sent(&self, _frame: &str) {}

    fn on_frame_received(&self, _frame: &str) {}
}
