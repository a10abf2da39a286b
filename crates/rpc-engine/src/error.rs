//! Error types for the correlation engine

use thiserror::Error;

use crate::domain::{ConfigError, RequestId};

/// Failure handed back to a caller of `send`.
///
/// Remote failures are classified once, here, by the engine; callers
/// match on the variant rather than on message text.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Remote rejected the credentials or token.
    #[error("There was a problem with authentication: {message}")]
    Authentication { message: String },

    /// Remote error code with no dedicated kind.
    #[error("Error code: {code} with message \"{message}\"")]
    UnknownRemote { code: i64, message: String },

    /// Engine is closed or the connection cannot be (re)established.
    #[error("Connection is not established")]
    NotConnected,

    /// Connection went away while the call was outstanding.
    #[error("Connection closed before a response arrived")]
    ConnectionClosed,

    #[error("Request {id} ({method}) timed out")]
    Timeout { id: RequestId, method: String },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Method name must not be empty")]
    InvalidMethod,

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl RpcError {
    /// Whether the failure was reported by the remote service.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            RpcError::Authentication { .. } | RpcError::UnknownRemote { .. }
        )
    }
}

/// Errors raised by a transport adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Transport is not open")]
    NotOpen,

    #[error("Transport channel closed")]
    ChannelClosed,
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        TransportError::WebSocket(e.to_string())
    }
}
