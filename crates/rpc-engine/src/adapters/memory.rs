//! In-process transport for tests and embedding.
//!
//! [`InMemoryTransport::new`] returns the transport half handed to the
//! engine and a [`RemoteEnd`] that plays the server: it accepts or refuses
//! connection attempts, reads the frames the engine wrote and pushes
//! replies back.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::error::TransportError;
use crate::ports::{Transport, TransportEvent};

#[derive(Debug, Default)]
struct Shared {
    events: Option<mpsc::Sender<TransportEvent>>,
    closes: usize,
    fail_sends: bool,
}

/// Transport half, owned by the engine.
pub struct InMemoryTransport {
    endpoint: String,
    shared: Arc<Mutex<Shared>>,
    frames: mpsc::UnboundedSender<String>,
    opens: watch::Sender<usize>,
}

impl InMemoryTransport {
    pub fn new(endpoint: impl Into<String>) -> (Self, RemoteEnd) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (opens_tx, opens_rx) = watch::channel(0);

        let transport = Self {
            endpoint: endpoint.into(),
            shared: shared.clone(),
            frames: frames_tx,
            opens: opens_tx,
        };
        let remote = RemoteEnd {
            shared,
            frames: frames_rx,
            opens: opens_rx,
            accepted: 0,
        };
        (transport, remote)
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn open(&mut self, events: mpsc::Sender<TransportEvent>) -> Result<(), TransportError> {
        self.shared.lock().events = Some(events);
        self.opens.send_modify(|n| *n += 1);
        Ok(())
    }

    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        {
            let shared = self.shared.lock();
            if shared.fail_sends {
                return Err(TransportError::WebSocket("simulated send failure".into()));
            }
            if shared.events.is_none() {
                return Err(TransportError::NotOpen);
            }
        }
        self.frames
            .send(frame)
            .map_err(|_| TransportError::ChannelClosed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let events = {
            let mut shared = self.shared.lock();
            shared.closes += 1;
            shared.events.take()
        };
        if let Some(events) = events {
            // The engine owns the receiver; never block on it here.
            let _ = events.try_send(TransportEvent::Close { reason: None });
        }
        Ok(())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Server side of an [`InMemoryTransport`].
pub struct RemoteEnd {
    shared: Arc<Mutex<Shared>>,
    frames: mpsc::UnboundedReceiver<String>,
    opens: watch::Receiver<usize>,
    accepted: usize,
}

impl RemoteEnd {
    /// Wait for the next connection attempt and complete it.
    pub async fn accept(&mut self) -> Result<(), TransportError> {
        self.wait_for_attempt().await?;
        self.emit(TransportEvent::Open).await
    }

    /// Wait for the next connection attempt and fail it.
    pub async fn refuse(&mut self, reason: &str) -> Result<(), TransportError> {
        self.wait_for_attempt().await?;
        self.emit(TransportEvent::Error(TransportError::Connect(reason.to_owned())))
            .await?;
        self.drop_connection(Some(reason)).await
    }

    /// Deliver a raw text frame to the engine.
    pub async fn push(&self, frame: impl Into<String>) -> Result<(), TransportError> {
        self.emit(TransportEvent::Message(frame.into())).await
    }

    /// Reply with `{"id": id, "result": result}`.
    pub async fn reply(&self, id: &Value, result: Value) -> Result<(), TransportError> {
        self.push(json!({ "id": id, "result": result }).to_string())
            .await
    }

    /// Reply with `{"id": id, "error": {"code": code, "message": message}}`.
    pub async fn reply_error(
        &self,
        id: &Value,
        code: i64,
        message: &str,
    ) -> Result<(), TransportError> {
        self.push(
            json!({ "id": id, "error": { "code": code, "message": message } }).to_string(),
        )
        .await
    }

    /// Report a transport error without closing.
    pub async fn error(&self, message: &str) -> Result<(), TransportError> {
        self.emit(TransportEvent::Error(TransportError::WebSocket(
            message.to_owned(),
        )))
        .await
    }

    /// Close the connection from the remote side.
    pub async fn drop_connection(&self, reason: Option<&str>) -> Result<(), TransportError> {
        let events = self
            .shared
            .lock()
            .events
            .take()
            .ok_or(TransportError::NotOpen)?;
        events
            .send(TransportEvent::Close {
                reason: reason.map(str::to_owned),
            })
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }

    /// Next frame the engine wrote, or `None` once the transport is dropped.
    pub async fn next_frame(&mut self) -> Option<String> {
        self.frames.recv().await
    }

    /// Next frame decoded as JSON.
    pub async fn next_request(&mut self) -> Option<Value> {
        let frame = self.next_frame().await?;
        serde_json::from_str(&frame).ok()
    }

    pub fn try_next_frame(&mut self) -> Option<String> {
        self.frames.try_recv().ok()
    }

    /// Make every following `send` fail.
    pub fn set_fail_sends(&self, fail: bool) {
        self.shared.lock().fail_sends = fail;
    }

    /// Connection attempts made so far.
    pub fn open_count(&self) -> usize {
        *self.opens.borrow()
    }

    /// `close` calls made so far.
    pub fn close_count(&self) -> usize {
        self.shared.lock().closes
    }

    async fn wait_for_attempt(&mut self) -> Result<(), TransportError> {
        let accepted = self.accepted;
        self.opens
            .wait_for(|opens| *opens > accepted)
            .await
            .map_err(|_| TransportError::ChannelClosed)?;
        self.accepted += 1;
        Ok(())
    }

    async fn emit(&self, event: TransportEvent) -> Result<(), TransportError> {
        let events = self
            .shared
            .lock()
            .events
            .clone()
            .ok_or(TransportError::NotOpen)?;
        events
            .send(event)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_flow_both_ways() {
        let (mut transport, mut remote) = InMemoryTransport::new("memory://test");
        let (tx, mut rx) = mpsc::channel(8);

        assert_eq!(
            transport.send("early".into()).await,
            Err(TransportError::NotOpen)
        );

        transport.open(tx).await.unwrap();
        remote.accept().await.unwrap();
        assert_eq!(rx.recv().await, Some(TransportEvent::Open));

        transport.send("hello".into()).await.unwrap();
        assert_eq!(remote.next_frame().await.as_deref(), Some("hello"));

        remote.push("world").await.unwrap();
        assert_eq!(
            rx.recv().await,
            Some(TransportEvent::Message("world".into()))
        );
    }

    #[tokio::test]
    async fn test_close_reports_close_event() {
        let (mut transport, remote) = InMemoryTransport::new("memory://test");
        let (tx, mut rx) = mpsc::channel(8);
        transport.open(tx).await.unwrap();

        transport.close().await.unwrap();
        assert_eq!(rx.recv().await, Some(TransportEvent::Close { reason: None }));
        assert_eq!(remote.close_count(), 1);
        assert_eq!(remote.open_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_sends() {
        let (mut transport, mut remote) = InMemoryTransport::new("memory://test");
        let (tx, _rx) = mpsc::channel(8);
        transport.open(tx).await.unwrap();

        remote.set_fail_sends(true);
        assert!(transport.send("lost".into()).await.is_err());
        assert!(remote.try_next_frame().is_none());
    }
}
