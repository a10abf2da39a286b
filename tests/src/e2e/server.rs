//! Scripted WebSocket server fixture.

use futures_util::{SinkExt, StreamExt};
use rpc_engine::{EngineConfig, MetricsSnapshot, RpcEngine};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

/// How long any single wait in a test may take.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Listener that completes WebSocket handshakes only when told to.
///
/// Until [`MockServer::accept`] is called the client's TCP connect
/// succeeds but its handshake stays pending, so the engine is not open.
pub struct MockServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl MockServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        Self { listener, addr }
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig::new("127.0.0.1", self.addr.port())
    }

    pub fn endpoint(&self) -> String {
        self.config().endpoint()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Accept the next connection and complete its handshake.
    pub async fn accept(&self) -> ServerConnection {
        let (stream, _) = tokio::time::timeout(STEP_TIMEOUT, self.listener.accept())
            .await
            .expect("no connection attempt")
            .unwrap();
        let ws = accept_async(stream).await.unwrap();
        ServerConnection { ws }
    }
}

/// Server side of one accepted connection.
pub struct ServerConnection {
    ws: WebSocketStream<TcpStream>,
}

impl ServerConnection {
    /// Next text frame, decoded. `None` once the client closed.
    pub async fn next_message(&mut self) -> Option<Value> {
        loop {
            let message = tokio::time::timeout(STEP_TIMEOUT, self.ws.next())
                .await
                .expect("no frame from client")?;
            match message {
                Ok(Message::Text(text)) => return Some(serde_json::from_str(text.as_str()).unwrap()),
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
    }

    pub async fn next_request(&mut self) -> Value {
        self.next_message().await.expect("connection closed")
    }

    pub async fn send_text(&mut self, text: impl Into<String>) {
        self.ws.send(Message::Text(text.into().into())).await.unwrap();
    }

    pub async fn reply(&mut self, id: &Value, result: Value) {
        self.send_text(json!({ "id": id, "result": result }).to_string())
            .await;
    }

    pub async fn reply_error(&mut self, id: &Value, code: i64, message: &str) {
        self.send_text(json!({ "id": id, "error": { "code": code, "message": message } }).to_string())
            .await;
    }

    /// Close from the server side.
    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
        // Drain until the client acknowledges
        while let Ok(Some(Ok(_))) = tokio::time::timeout(STEP_TIMEOUT, self.ws.next()).await {}
    }
}

/// Poll engine metrics until `condition` holds.
pub async fn wait_for_metrics(engine: &RpcEngine, condition: impl Fn(&MetricsSnapshot) -> bool) {
    tokio::time::timeout(STEP_TIMEOUT, async {
        while !condition(&engine.metrics()) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("metrics condition not reached");
}

/// A port nothing listens on.
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}
