//! Connection options and environment loading.

use rpc_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::env;

use crate::error::{ClientError, Result};

/// Environment variables read by [`ClientOptions::from_env`].
pub mod vars {
    pub const HOST: &str = "SURREAL_HOST";
    pub const PORT: &str = "SURREAL_PORT";
    pub const USER: &str = "SURREAL_USER";
    pub const PASS: &str = "SURREAL_PASS";
    pub const NS: &str = "SURREAL_NS";
    pub const DB: &str = "SURREAL_DB";
    pub const SSL: &str = "SURREAL_SSL";
    pub const LOG_FRAMES: &str = "SURREAL_LOG_FRAMES";
}

/// Where and as whom to connect.
///
/// Every field is optional so explicit options can be layered over the
/// environment; only `host` and `port` are required to connect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub db: Option<String>,
    pub ns: Option<String>,
    pub ssl: Option<bool>,
    /// Log every frame sent and received at debug level
    pub log_frames: Option<bool>,
}

impl ClientOptions {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: Some(host.into()),
            port: Some(port),
            ..Self::default()
        }
    }

    pub fn credentials(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.pass = Some(pass.into());
        self
    }

    pub fn namespace(mut self, ns: impl Into<String>, db: impl Into<String>) -> Self {
        self.ns = Some(ns.into());
        self.db = Some(db.into());
        self
    }

    pub fn ssl(mut self, ssl: bool) -> Self {
        self.ssl = Some(ssl);
        self
    }

    pub fn log_frames(mut self, log_frames: bool) -> Self {
        self.log_frames = Some(log_frames);
        self
    }

    /// Create options from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SURREAL_HOST`, `SURREAL_PORT`: endpoint
    /// - `SURREAL_USER`, `SURREAL_PASS`: sign-in credentials
    /// - `SURREAL_NS`, `SURREAL_DB`: namespace and database
    /// - `SURREAL_SSL`: use `wss` (`true`/`1`)
    /// - `SURREAL_LOG_FRAMES`: log frames (`true`/`1`)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port: Option<u16> = match lookup(vars::PORT) {
            Some(raw) => Some(raw.trim().parse().map_err(|_| ClientError::InvalidOption {
                key: vars::PORT,
                value: raw,
            })?),
            None => None,
        };

        Ok(Self {
            host: lookup(vars::HOST).filter(|h| !h.trim().is_empty()),
            port,
            user: lookup(vars::USER),
            pass: lookup(vars::PASS),
            db: lookup(vars::DB),
            ns: lookup(vars::NS),
            ssl: lookup(vars::SSL)
                .map(|raw| parse_flag(vars::SSL, raw))
                .transpose()?,
            log_frames: lookup(vars::LOG_FRAMES)
                .map(|raw| parse_flag(vars::LOG_FRAMES, raw))
                .transpose()?,
        })
    }

    /// Fill every unset field from `fallback`.
    pub fn or(self, fallback: ClientOptions) -> Self {
        Self {
            host: self.host.or(fallback.host),
            port: self.port.or(fallback.port),
            user: self.user.or(fallback.user),
            pass: self.pass.or(fallback.pass),
            db: self.db.or(fallback.db),
            ns: self.ns.or(fallback.ns),
            ssl: self.ssl.or(fallback.ssl),
            log_frames: self.log_frames.or(fallback.log_frames),
        }
    }

    /// Fill every unset field from the environment.
    pub fn or_env(self) -> Result<Self> {
        Ok(self.or(Self::from_env()?))
    }

    /// Engine configuration for these options.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let (Some(host), Some(port)) = (self.host.as_deref(), self.port) else {
            return Err(ClientError::MissingConnectionInformation);
        };

        let mut config = EngineConfig::new(host, port);
        config.tls = self.ssl.unwrap_or(false);
        Ok(config)
    }

    pub fn logs_frames(&self) -> bool {
        self.log_frames.unwrap_or(false)
    }

    /// `signin` arguments, when both user and pass are set.
    pub fn signin_params(&self) -> Option<Value> {
        let (user, pass) = (self.user.as_ref()?, self.pass.as_ref()?);
        let mut params = json!({ "user": user, "pass": pass });
        if let Some(ns) = &self.ns {
            params["NS"] = json!(ns);
        }
        if let Some(db) = &self.db {
            params["DB"] = json!(db);
        }
        Some(params)
    }

    /// `use` arguments, when both namespace and database are set.
    pub fn use_params(&self) -> Option<Value> {
        Some(json!([self.ns.as_ref()?, self.db.as_ref()?]))
    }
}

fn parse_flag(key: &'static str, raw: String) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ClientError::InvalidOption { key, value: raw }),
    }
}
