//! Domain types for the correlation engine.
//!
//! Pure data and bookkeeping: identifiers, wire messages, error
//! classification, connection state, the pending/holding tables and
//! configuration. No I/O happens here.

pub mod config;
pub mod exceptions;
pub mod identifier;
pub mod messages;
pub mod pending;
pub mod state;

// Re-exports for convenience
pub use config::{ConfigError, EngineConfig, ReconnectPolicy};
pub use exceptions::{ExceptionKind, ExceptionRule, ExceptionTable};
pub use identifier::{IdGenerator, RequestId, MAX_SAFE_INTEGER};
pub use messages::{InboundFrame, Params, RemoteError, Request};
pub use pending::{CallResult, Caller, HoldingQueue, InternalCall, PendingCall, PendingTable};
pub use state::ConnectionState;
