//! # RPC Client
//!
//! Typed database façade over [`rpc_engine`].
//!
//! Operations (`select`, `create`, `query`, ...) forward a method name and
//! positional arguments to the engine and decode the result. Connection
//! details come from [`ClientOptions`], layered over `SURREAL_*`
//! environment variables.
//!
//! ## Usage
//!
//! ```ignore
//! use rpc_client::{Client, ClientOptions};
//!
//! let options = ClientOptions::new("localhost", 8000)
//!     .credentials("root", "root")
//!     .namespace("test", "test");
//! let client = Client::connect(options)?;
//!
//! let people: Vec<Person> = client.select_as("person").await?;
//! client.close().await?;
//! ```

pub mod client;
pub mod error;
pub mod options;

pub use client::{Client, QueryResult};
pub use error::{ClientError, Result};
pub use options::ClientOptions;

pub use rpc_engine::{ConnectionState, RpcError};
