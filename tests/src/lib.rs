//! # RPC Test Suite
//!
//! End-to-end tests for the engine and the client façade, run against an
//! in-process `tokio-tungstenite` server.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── e2e/
//!     ├── server.rs        # Scripted WebSocket server fixture
//!     ├── engine_flows.rs  # Correlation, buffering, errors, close
//!     └── client_flows.rs  # Bootstrap, CRUD, query decoding
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p rpc-tests
//! cargo test -p rpc-tests e2e::engine_flows::
//! ```

pub mod e2e;
