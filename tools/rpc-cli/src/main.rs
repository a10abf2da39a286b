//! rpc-cli: issue calls against a database over its RPC WebSocket.
//!
//! ## Usage
//!
//! ```bash
//! # Arbitrary method with JSON params
//! rpc-cli --host localhost --port 8000 --user root --pass root \
//!     --ns test --db test call select '"person"'
//!
//! # Query
//! rpc-cli query 'SELECT * FROM person WHERE age > 18'
//!
//! # Liveness
//! rpc-cli ping
//! ```
//!
//! Unset flags fall back to `SURREAL_*` environment variables.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rpc_client::{Client, ClientOptions};
use rpc_telemetry::{init_telemetry, TelemetryConfig};
use serde_json::Value;
use tracing::debug;

/// RPC command-line client
#[derive(Parser, Debug)]
#[command(name = "rpc-cli")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Remote host
    #[arg(long)]
    host: Option<String>,

    /// Remote port
    #[arg(long)]
    port: Option<u16>,

    /// Connect with `wss`
    #[arg(long)]
    ssl: bool,

    /// Sign-in user
    #[arg(long)]
    user: Option<String>,

    /// Sign-in password
    #[arg(long)]
    pass: Option<String>,

    /// Namespace
    #[arg(long)]
    ns: Option<String>,

    /// Database
    #[arg(long)]
    db: Option<String>,

    /// Log every frame at debug level
    #[arg(long)]
    log_frames: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Call METHOD with optional JSON params
    Call {
        method: String,
        /// JSON value; an array is taken as the argument list
        params: Option<String>,
    },
    /// Run a query
    Query {
        sql: String,
        /// JSON object of query variables
        #[arg(long)]
        vars: Option<String>,
    },
    /// Check the connection
    Ping,
}

impl Args {
    fn options(&self) -> ClientOptions {
        ClientOptions {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            pass: self.pass.clone(),
            db: self.db.clone(),
            ns: self.ns.clone(),
            ssl: self.ssl.then_some(true),
            log_frames: self.log_frames.then_some(true),
        }
    }
}

fn parse_json(raw: Option<&str>, what: &str) -> Result<Option<Value>> {
    raw.map(|raw| serde_json::from_str(raw).with_context(|| format!("Invalid JSON in {what}")))
        .transpose()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _telemetry = init_telemetry(TelemetryConfig::for_service("rpc-cli"))
        .await
        .context("Failed to initialize telemetry")?;

    let client = Client::connect(args.options()).context("Failed to create client")?;

    let outcome = match &args.command {
        Command::Call { method, params } => {
            let params = parse_json(params.as_deref(), "params")?;
            debug!(method = %method, "Calling");
            client.call(method, params).await
        }
        Command::Query { sql, vars } => {
            let vars = parse_json(vars.as_deref(), "vars")?;
            client.query(sql, vars).await
        }
        Command::Ping => client.ping().await,
    };

    client.close().await.context("Failed to close connection")?;

    let result = outcome.context("Call failed")?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
