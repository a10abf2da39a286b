//! Adapters Layer
//!
//! Concrete transports behind the [`Transport`](crate::ports::Transport)
//! port and the default [`EngineObserver`](crate::ports::EngineObserver).

pub mod memory;
pub mod observer;
pub mod websocket;

pub use memory::{InMemoryTransport, RemoteEnd};
pub use observer::TracingObserver;
pub use websocket::WebSocketTransport;
