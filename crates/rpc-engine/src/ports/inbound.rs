//! Inbound Ports (Driving Ports)
//!
//! The single entry point domain façades use. Façades own no protocol
//! knowledge beyond a method name and its positional arguments.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{ConnectionState, Params};
use crate::error::RpcError;

/// Generic RPC API (Driving Port)
#[async_trait]
pub trait RpcApi: Send + Sync {
    /// Issue `method` with positional `params` and wait for the correlated
    /// result.
    ///
    /// Resolves exactly once: with the remote `result`, or with a typed
    /// failure (remote error, timeout, connection loss, ...).
    async fn send(&self, method: &str, params: Params) -> Result<Value, RpcError>;

    /// Shut the connection down, failing every outstanding call.
    async fn close(&self) -> Result<(), RpcError>;

    /// Current connection state.
    fn state(&self) -> ConnectionState;
}
