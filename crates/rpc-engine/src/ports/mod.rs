//! Ports Layer
//!
//! - Driving port (inbound): [`RpcApi`], what façades call into.
//! - Driven ports (outbound): [`Transport`], the raw connection the engine
//!   owns, and [`EngineObserver`], the logging collaborator lifecycle events
//!   are surfaced to.

pub mod inbound;
pub mod outbound;

pub use inbound::RpcApi;
pub use outbound::{EngineObserver, Transport, TransportEvent};
