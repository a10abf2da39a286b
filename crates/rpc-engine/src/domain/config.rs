//! Engine configuration with validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Path every endpoint is served under.
pub const RPC_PATH: &str = "/rpc";

/// Default keepalive cadence.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Remote host
    pub host: String,
    /// Remote port
    pub port: u16,
    /// Use `wss` instead of `ws`
    pub tls: bool,
    /// Interval between `ping` requests while connected
    #[serde(with = "humantime_serde")]
    pub keepalive_interval: Duration,
    /// Deadline applied to every call; `None` waits forever
    #[serde(with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
    /// How often expired calls are swept
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Capacity of the caller -> engine command channel
    pub command_buffer: usize,
    /// Reconnection after an unrequested close
    pub reconnect: ReconnectPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8000,
            tls: false,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            sweep_interval: Duration::from_secs(1),
            command_buffer: 256,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Configuration for `host:port` with everything else defaulted.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// `ws(s)://<host>:<port>/rpc`
    pub fn endpoint(&self) -> String {
        let scheme = if self.tls { "wss" } else { "ws" };
        format!("{}://{}:{}{}", scheme, self.host, self.port, RPC_PATH)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        if self.keepalive_interval.is_zero() {
            return Err(ConfigError::InvalidInterval(
                "keepalive_interval cannot be 0".into(),
            ));
        }

        if self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidInterval(
                "sweep_interval cannot be 0".into(),
            ));
        }

        if matches!(self.request_timeout, Some(t) if t.is_zero()) {
            return Err(ConfigError::InvalidInterval(
                "request_timeout cannot be 0".into(),
            ));
        }

        if self.command_buffer == 0 {
            return Err(ConfigError::Invalid("command_buffer cannot be 0".into()));
        }

        self.reconnect.validate()
    }
}

/// Exponential backoff between reconnection attempts.
///
/// `max_attempts == 0` disables reconnection: the first unrequested close
/// is final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

impl ReconnectPolicy {
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }

    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }

    /// Delay before attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(6);
        std::cmp::min(self.base_delay.saturating_mul(factor), self.max_delay)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.is_enabled() && self.base_delay.is_zero() {
            return Err(ConfigError::InvalidInterval(
                "reconnect.base_delay cannot be 0".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("host must not be empty")]
    MissingHost,
    #[error("port must not be 0")]
    InvalidPort,
    #[error("invalid interval: {0}")]
    InvalidInterval(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
