//! Client error types

use rpc_engine::RpcError;
use thiserror::Error;

/// Errors returned by the client façade.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Failure reported by the engine, already classified.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("There were no connection information passed. Check your options or environment")]
    MissingConnectionInformation,

    #[error("Invalid value {value:?} for {key}")]
    InvalidOption { key: &'static str, value: String },
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Rpc(RpcError::Serialization(e))
    }
}

impl ClientError {
    /// The engine failure, if this is one.
    pub fn as_rpc(&self) -> Option<&RpcError> {
        match self {
            ClientError::Rpc(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
