//! # RPC Engine
//!
//! Multiplexes many concurrent request/response calls over one persistent
//! WebSocket connection.
//!
//! Every call gets a process-unique identifier; inbound frames are routed
//! back to the waiting caller by that identifier, in whatever order they
//! arrive. Calls made before the connection is open are held and sent as
//! soon as it opens. Remote error codes are classified into typed
//! failures, and a keepalive `ping` runs while connected.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        rpc-engine                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │   Façades (rpc-client, rpc-cli)                              │
//! │          │  RpcApi::send(method, params)                     │
//! │          ▼                                                   │
//! │   ┌──────────────┐   commands   ┌──────────────────────────┐ │
//! │   │  RpcEngine   │ ───────────► │       EngineActor        │ │
//! │   │   (handle)   │ ◄─ oneshot ─ │ ids / pending / holding  │ │
//! │   └──────────────┘              │ keepalive / timeouts     │ │
//! │                                 └────────────┬─────────────┘ │
//! │                                              │ Transport     │
//! │                         ┌────────────────────┴────────────┐  │
//! │                         │ WebSocketTransport │ InMemory   │  │
//! │                         └─────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **Domain** (`domain/`): identifiers, wire messages, error
//!   classification, pending table and holding queue. No I/O.
//! - **Ports** (`ports/`): [`RpcApi`] (driving), [`Transport`] and
//!   [`EngineObserver`] (driven).
//! - **Adapters** (`adapters/`): WebSocket and in-memory transports, the
//!   tracing observer.
//! - **Service** (`service.rs`): the actor that owns all mutable state.
//!
//! ## Invariants
//!
//! - Identifiers are never `0` and never reused while a call holding them is
//!   outstanding.
//! - Every `send` resolves exactly once.
//! - Held calls are written in identifier order, after any bootstrap
//!   requests, when the connection opens.
//!
//! ## Usage
//!
//! ```ignore
//! use rpc_engine::{EngineConfig, RpcEngine};
//! use serde_json::json;
//!
//! let engine = RpcEngine::connect(EngineConfig::new("localhost", 8000))?;
//! let people = engine.send("select", json!("person")).await?;
//! engine.close().await?;
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-export main types
pub use adapters::{InMemoryTransport, RemoteEnd, TracingObserver, WebSocketTransport};
pub use domain::{
    ConfigError, ConnectionState, EngineConfig, ExceptionKind, ExceptionRule, ExceptionTable,
    IdGenerator, Params, ReconnectPolicy, RemoteError, RequestId, MAX_SAFE_INTEGER,
};
pub use error::{RpcError, TransportError};
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use ports::{EngineObserver, RpcApi, Transport, TransportEvent};
pub use service::{EngineBuilder, RpcEngine, KEEPALIVE_METHOD};
