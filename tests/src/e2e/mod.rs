//! # End-to-End Flows
//!
//! ```text
//! [RpcEngine / Client] ──ws://127.0.0.1:<port>/rpc──→ [MockServer]
//!          ↑                                               │
//!          └──────────── result / error frames ────────────┘
//! ```
//!
//! The server is scripted per test: it reads the frames the engine wrote
//! and answers in whatever order the test chooses.

#[cfg(test)]
mod server;

#[cfg(test)]
mod client_flows;
#[cfg(test)]
mod engine_flows;
