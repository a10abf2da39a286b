//! # RPC Telemetry
//!
//! Logging and tracing setup shared by the client binaries.
//!
//! Console logs go through a `tracing-subscriber` registry filtered by
//! `EnvFilter`, formatted either for humans or as JSON. When an OTLP
//! endpoint is configured, spans are also exported through OpenTelemetry.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rpc_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::for_service("rpc-cli"))
//!         .await
//!         .expect("Failed to init telemetry");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RPC_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `RPC_JSON_LOGS` | `false` | JSON console output |
//! | `RPC_CONSOLE_OUTPUT` | `true` | Write logs to the console |
//! | `OTEL_SERVICE_NAME` | `rpc-client` | Service name in traces |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | unset | OTLP collector, export disabled when unset |

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::TracingGuard;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing: {0}")]
    TracerInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install logging and, if configured, trace export.
///
/// Returns a guard that must be held for the lifetime of the application.
/// When dropped, it flushes pending spans.
pub async fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let tracing_guard = tracing_setup::init_tracing(&config).await?;
    Ok(TelemetryGuard {
        _tracing: tracing_guard,
    })
}

/// Guard that keeps telemetry active. Drop to flush and shutdown.
pub struct TelemetryGuard {
    _tracing: TracingGuard,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::debug!("Shutting down telemetry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_without_exporter() {
        let guard = init_telemetry(TelemetryConfig {
            console_output: false,
            ..TelemetryConfig::default()
        })
        .await
        .unwrap();
        assert!(!guard._tracing.exports_traces());

        // A global subscriber can only be installed once
        assert!(matches!(
            init_telemetry(TelemetryConfig::default()).await,
            Err(TelemetryError::TracerInit(_))
        ));
    }
}
