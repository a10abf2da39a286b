//! WebSocket transport over `tokio-tungstenite`.
//!
//! `open` spawns a connection task. The task connects, reports `Open`, then
//! multiplexes two directions in one loop: outbound frames from an ordered
//! channel, and inbound frames forwarded as `Message` events. Pings are
//! answered with pongs. A close requested during the handshake ends the
//! task at once. The task always finishes with a `Close` event.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, trace, warn};

use crate::error::TransportError;
use crate::ports::{Transport, TransportEvent};

/// How long `close` waits for the connection task before aborting it.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

enum Outbound {
    Frame(String),
    Close,
}

/// Transport owning one WebSocket connection.
pub struct WebSocketTransport {
    endpoint: String,
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
    task: Option<JoinHandle<()>>,
}

impl WebSocketTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            outbound: None,
            task: None,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&mut self, events: mpsc::Sender<TransportEvent>) -> Result<(), TransportError> {
        if let Some(task) = self.task.take() {
            // Previous connection is gone; make sure its task is too.
            task.abort();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound = Some(tx);
        self.task = Some(tokio::spawn(run_connection(
            self.endpoint.clone(),
            rx,
            events,
        )));
        Ok(())
    }

    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.outbound
            .as_ref()
            .ok_or(TransportError::NotOpen)?
            .send(Outbound::Frame(frame))
            .map_err(|_| TransportError::ChannelClosed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(tx) = self.outbound.take() {
            let _ = tx.send(Outbound::Close);
        }

        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err() {
                warn!(endpoint = %self.endpoint, "Connection task did not stop in time, aborting");
                task.abort();
            }
        }
        Ok(())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Run a single WebSocket connection.
async fn run_connection(
    endpoint: String,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::Sender<TransportEvent>,
) {
    // Frames written before the handshake completes go out right after it.
    let mut early = Vec::new();
    let handshake = connect_async(endpoint.as_str());
    tokio::pin!(handshake);

    let stream = loop {
        tokio::select! {
            result = &mut handshake => match result {
                Ok((stream, _response)) => break stream,
                Err(e) => {
                    let reason = e.to_string();
                    let _ = events
                        .send(TransportEvent::Error(TransportError::Connect(reason.clone())))
                        .await;
                    let _ = events
                        .send(TransportEvent::Close {
                            reason: Some(reason),
                        })
                        .await;
                    return;
                }
            },
            command = outbound.recv() => match command {
                Some(Outbound::Frame(frame)) => early.push(frame),
                Some(Outbound::Close) | None => {
                    debug!(endpoint = %endpoint, "Closed during handshake");
                    let _ = events.send(TransportEvent::Close { reason: None }).await;
                    return;
                }
            },
        }
    };

    if events.send(TransportEvent::Open).await.is_err() {
        return;
    }

    let (mut write, mut read) = stream.split();

    for frame in early {
        if let Err(e) = write.send(Message::Text(frame.into())).await {
            let reason = e.to_string();
            let _ = events.send(TransportEvent::Error(e.into())).await;
            let _ = events
                .send(TransportEvent::Close {
                    reason: Some(reason),
                })
                .await;
            return;
        }
    }

    let reason = loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Frame(frame)) => {
                    if let Err(e) = write.send(Message::Text(frame.into())).await {
                        let reason = e.to_string();
                        let _ = events.send(TransportEvent::Error(e.into())).await;
                        break Some(reason);
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = write.send(Message::Close(None)).await;
                    break None;
                }
            },
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if events
                        .send(TransportEvent::Message(text.as_str().to_owned()))
                        .await
                        .is_err()
                    {
                        break None;
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    break frame.map(|f| f.reason.as_str().to_owned());
                }
                Some(Ok(Message::Binary(bytes))) => {
                    debug!(len = bytes.len(), "Ignoring binary frame");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let reason = e.to_string();
                    let _ = events.send(TransportEvent::Error(e.into())).await;
                    break Some(reason);
                }
                None => break None,
            }
        }
    };

    trace!(endpoint = %endpoint, ?reason, "WebSocket connection finished");
    let _ = events.send(TransportEvent::Close { reason }).await;
}
