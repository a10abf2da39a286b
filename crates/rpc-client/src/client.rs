//! Database façade.
//!
//! Each operation is a thin forward to [`RpcApi::send`]: a method name plus
//! positional arguments. Result decoding is the only thing added here;
//! error classification already happened in the engine.

use rpc_engine::{
    ConnectionState, EngineBuilder, Params, RpcApi, RpcEngine, TracingObserver, Transport,
    WebSocketTransport,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::options::ClientOptions;

/// One statement's outcome from `query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult<T> {
    #[serde(default = "Vec::new")]
    pub result: Vec<T>,
    pub status: String,
    #[serde(default)]
    pub time: String,
}

impl<T> QueryResult<T> {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("OK")
    }
}

/// Database client.
///
/// Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct Client {
    rpc: Arc<dyn RpcApi>,
}

impl Client {
    /// Connect over WebSocket.
    ///
    /// Unset options are filled from the environment. Sign-in and namespace
    /// selection are sent on every (re)connect before any other call.
    pub fn connect(options: ClientOptions) -> Result<Self> {
        let options = options.or_env()?;
        let config = options.engine_config()?;
        let transport = WebSocketTransport::new(config.endpoint());
        Self::connect_with_transport(options, transport)
    }

    /// Connect over `transport` using `options` as given.
    pub fn connect_with_transport<T: Transport>(
        options: ClientOptions,
        transport: T,
    ) -> Result<Self> {
        let config = options.engine_config()?;
        info!(endpoint = %config.endpoint(), ns = ?options.ns, db = ?options.db, "Connecting");

        let mut builder = EngineBuilder::new(config).observer(Arc::new(
            TracingObserver::with_frame_logging(options.logs_frames()),
        ));
        if let Some(params) = options.signin_params() {
            builder = builder.bootstrap("signin", params);
        }
        if let Some(params) = options.use_params() {
            builder = builder.bootstrap("use", params);
        }

        let engine = builder.build_with_transport(transport)?;
        Ok(Self::from_engine(engine))
    }

    pub fn from_engine(engine: RpcEngine) -> Self {
        Self::from_api(Arc::new(engine))
    }

    /// Wrap any [`RpcApi`] implementation.
    pub fn from_api(rpc: Arc<dyn RpcApi>) -> Self {
        Self { rpc }
    }

    pub fn state(&self) -> ConnectionState {
        self.rpc.state()
    }

    /// Close the connection; outstanding calls fail.
    pub async fn close(&self) -> Result<()> {
        Ok(self.rpc.close().await?)
    }

    /// Forward `method` with `params` to the engine.
    pub async fn call(&self, method: &str, params: impl Into<Params>) -> Result<Value> {
        debug!(method, "Calling");
        Ok(self.rpc.send(method, params.into()).await?)
    }

    /// [`call`](Self::call), decoding the result into `T`.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: impl Into<Params>,
    ) -> Result<T> {
        let value = self.call(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn signin(&self, credentials: impl Serialize) -> Result<Value> {
        self.call("signin", vec![to_value(credentials)?]).await
    }

    pub async fn signup(&self, vars: impl Serialize) -> Result<Value> {
        self.call("signup", vec![to_value(vars)?]).await
    }

    pub async fn authenticate(&self, token: &str) -> Result<Value> {
        self.call("authenticate", vec![json!(token)]).await
    }

    pub async fn invalidate(&self) -> Result<Value> {
        self.call("invalidate", Params::none()).await
    }

    /// Switch namespace and database (`use`).
    pub async fn use_ns_db(&self, ns: &str, db: &str) -> Result<Value> {
        self.call("use", vec![json!(ns), json!(db)]).await
    }

    pub async fn info(&self) -> Result<Value> {
        self.call("info", Params::none()).await
    }

    pub async fn ping(&self) -> Result<Value> {
        self.call("ping", Params::none()).await
    }

    pub async fn query(&self, sql: &str, vars: Option<Value>) -> Result<Value> {
        self.call("query", query_params(sql, vars)).await
    }

    pub async fn query_as<T: DeserializeOwned>(
        &self,
        sql: &str,
        vars: Option<Value>,
    ) -> Result<Vec<QueryResult<T>>> {
        self.call_as("query", query_params(sql, vars)).await
    }

    /// Select every record in a table, or one record by id.
    pub async fn select(&self, thing: &str) -> Result<Value> {
        self.call("select", vec![json!(thing)]).await
    }

    pub async fn select_as<T: DeserializeOwned>(&self, thing: &str) -> Result<T> {
        self.call_as("select", vec![json!(thing)]).await
    }

    pub async fn create(&self, thing: &str, data: impl Serialize) -> Result<Value> {
        self.call("create", vec![json!(thing), to_value(data)?]).await
    }

    pub async fn create_as<T: DeserializeOwned>(
        &self,
        thing: &str,
        data: impl Serialize,
    ) -> Result<T> {
        self.call_as("create", vec![json!(thing), to_value(data)?])
            .await
    }

    /// Replace record content.
    pub async fn update(&self, thing: &str, data: impl Serialize) -> Result<Value> {
        self.call("update", vec![json!(thing), to_value(data)?]).await
    }

    pub async fn update_as<T: DeserializeOwned>(
        &self,
        thing: &str,
        data: impl Serialize,
    ) -> Result<T> {
        self.call_as("update", vec![json!(thing), to_value(data)?])
            .await
    }

    /// Merge `data` into record content (`change`).
    pub async fn merge(&self, thing: &str, data: impl Serialize) -> Result<Value> {
        self.call("change", vec![json!(thing), to_value(data)?]).await
    }

    pub async fn merge_as<T: DeserializeOwned>(
        &self,
        thing: &str,
        data: impl Serialize,
    ) -> Result<T> {
        self.call_as("change", vec![json!(thing), to_value(data)?])
            .await
    }

    /// Apply JSON Patch operations (`modify`).
    pub async fn patch(&self, thing: &str, ops: impl Serialize) -> Result<Value> {
        self.call("modify", vec![json!(thing), to_value(ops)?]).await
    }

    pub async fn delete(&self, thing: &str) -> Result<Value> {
        self.call("delete", vec![json!(thing)]).await
    }

    /// Define a connection-scoped variable (`let`).
    pub async fn let_var(&self, name: &str, value: impl Serialize) -> Result<Value> {
        self.call("let", vec![json!(name), to_value(value)?]).await
    }

    pub async fn unset(&self, name: &str) -> Result<Value> {
        self.call("unset", vec![json!(name)]).await
    }

    /// Start a live query on `table`; the result is the live query id.
    pub async fn live(&self, table: &str) -> Result<Value> {
        self.call("live", vec![json!(table)]).await
    }

    /// Stop the live query `query`.
    pub async fn kill(&self, query: &str) -> Result<Value> {
        self.call("kill", vec![json!(query)]).await
    }
}

fn to_value(value: impl Serialize) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn query_params(sql: &str, vars: Option<Value>) -> Params {
    match vars {
        Some(vars) => vec![json!(sql), vars].into(),
        None => vec![json!(sql)].into(),
    }
}
