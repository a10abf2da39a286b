//! Engine service - owns the connection and every outstanding call.
//!
//! A single actor task holds all mutable state: the identifier generator,
//! the pending table, the holding queue and the connection state. Handles
//! ([`RpcEngine`]) talk to it over a command channel, so no lock is ever
//! held across an await point.
//!
//! ```text
//!   RpcEngine::send ──► commands ──┐
//!                                  ▼
//!   Transport events ─────► ┌─────────────┐ ──► Transport::send
//!   keepalive tick ───────► │ EngineActor │
//!   timeout sweep ────────► └─────────────┘ ──► oneshot reply
//! ```

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::pending;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::adapters::{TracingObserver, WebSocketTransport};
use crate::domain::{
    CallResult, Caller, ConnectionState, EngineConfig, ExceptionTable, HoldingQueue, IdGenerator,
    InboundFrame, InternalCall, Params, PendingCall, PendingTable, Request, RequestId,
};
use crate::error::RpcError;
use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::ports::{EngineObserver, RpcApi, Transport, TransportEvent};

/// Method the engine sends on every keepalive tick.
pub const KEEPALIVE_METHOD: &str = "ping";

/// Capacity of each connection's event channel.
const EVENT_BUFFER: usize = 256;

enum EngineCommand {
    Send {
        method: String,
        params: Params,
        reply: oneshot::Sender<CallResult>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running engine.
///
/// Cheap to clone; every clone talks to the same connection. The engine
/// stops on [`RpcEngine::close`], once the connection is lost for good, or
/// once the last handle is dropped. A stopped engine fails every `send`
/// with [`RpcError::NotConnected`].
#[derive(Clone)]
pub struct RpcEngine {
    commands: mpsc::Sender<EngineCommand>,
    state: watch::Receiver<ConnectionState>,
    metrics: Arc<EngineMetrics>,
    endpoint: Arc<str>,
}

impl RpcEngine {
    /// Start an engine over WebSocket with default collaborators.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(config: EngineConfig) -> Result<Self, RpcError> {
        Self::builder(config).build()
    }

    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    /// Issue `method` with `params` and wait for the correlated result.
    ///
    /// Calls made before the connection opens are held and sent once it
    /// does.
    pub async fn send(
        &self,
        method: &str,
        params: impl Into<Params>,
    ) -> Result<Value, RpcError> {
        if method.trim().is_empty() {
            return Err(RpcError::InvalidMethod);
        }

        let (reply, rx) = oneshot::channel();
        self.commands
            .send(EngineCommand::Send {
                method: method.to_owned(),
                params: params.into(),
                reply,
            })
            .await
            .map_err(|_| RpcError::NotConnected)?;

        rx.await.map_err(|_| RpcError::NotConnected)?
    }

    /// [`send`](Self::send), decoding the result into `T`.
    pub async fn send_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: impl Into<Params>,
    ) -> Result<T, RpcError> {
        let value = self.send(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Close the connection and fail every outstanding call with
    /// [`RpcError::ConnectionClosed`]. Closing twice is a no-op.
    pub async fn close(&self) -> Result<(), RpcError> {
        let (reply, rx) = oneshot::channel();
        if self
            .commands
            .send(EngineCommand::Close { reply })
            .await
            .is_err()
        {
            return Ok(());
        }
        let _ = rx.await;
        Ok(())
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Wait until the connection is open.
    ///
    /// Fails with [`RpcError::NotConnected`] if the engine stops first.
    pub async fn wait_for_connected(&self) -> Result<(), RpcError> {
        let mut state = self.state.clone();
        let connected = state.wait_for(ConnectionState::is_connected).await.is_ok();
        if connected {
            Ok(())
        } else {
            Err(RpcError::NotConnected)
        }
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl RpcApi for RpcEngine {
    async fn send(&self, method: &str, params: Params) -> Result<Value, RpcError> {
        RpcEngine::send(self, method, params).await
    }

    async fn close(&self) -> Result<(), RpcError> {
        RpcEngine::close(self).await
    }

    fn state(&self) -> ConnectionState {
        RpcEngine::state(self)
    }
}

/// Assembles an engine and its collaborators.
pub struct EngineBuilder {
    config: EngineConfig,
    observer: Arc<dyn EngineObserver>,
    exceptions: ExceptionTable,
    bootstrap: Vec<(String, Params)>,
    ids: IdGenerator,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            observer: Arc::new(TracingObserver::new()),
            exceptions: ExceptionTable::default(),
            bootstrap: Vec::new(),
            ids: IdGenerator::new(),
        }
    }

    pub fn observer(mut self, observer: Arc<dyn EngineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn exceptions(mut self, exceptions: ExceptionTable) -> Self {
        self.exceptions = exceptions;
        self
    }

    /// Request sent on every open, before any held call.
    ///
    /// Failures are logged; they never reach a caller.
    pub fn bootstrap(mut self, method: impl Into<String>, params: impl Into<Params>) -> Self {
        self.bootstrap.push((method.into(), params.into()));
        self
    }

    pub fn id_generator(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    /// Build an engine connecting over WebSocket to the configured endpoint.
    pub fn build(self) -> Result<RpcEngine, RpcError> {
        let transport = WebSocketTransport::new(self.config.endpoint());
        self.build_with_transport(transport)
    }

    /// Build an engine over any transport and start connecting.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<RpcEngine, RpcError> {
        self.config.validate()?;

        let (commands_tx, commands_rx) = mpsc::channel(self.config.command_buffer);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let metrics = Arc::new(EngineMetrics::new());
        let endpoint: Arc<str> = Arc::from(transport.endpoint());

        let actor = EngineActor {
            config: self.config,
            transport,
            observer: self.observer,
            exceptions: self.exceptions,
            bootstrap: self.bootstrap,
            ids: self.ids,
            state: state_tx,
            pending: PendingTable::new(),
            holding: HoldingQueue::new(),
            commands: commands_rx,
            events: None,
            keepalive: None,
            reconnect_at: None,
            reconnect_attempts: 0,
            lost: false,
            metrics: metrics.clone(),
        };
        tokio::spawn(actor.run());

        Ok(RpcEngine {
            commands: commands_tx,
            state: state_rx,
            metrics,
            endpoint,
        })
    }
}

struct EngineActor<T: Transport> {
    config: EngineConfig,
    transport: T,
    observer: Arc<dyn EngineObserver>,
    exceptions: ExceptionTable,
    bootstrap: Vec<(String, Params)>,
    ids: IdGenerator,
    state: watch::Sender<ConnectionState>,
    pending: PendingTable,
    holding: HoldingQueue,
    commands: mpsc::Receiver<EngineCommand>,
    /// Events of the current connection attempt only.
    events: Option<mpsc::Receiver<TransportEvent>>,
    keepalive: Option<Interval>,
    reconnect_at: Option<Instant>,
    reconnect_attempts: u32,
    /// Set once no further connection will be attempted; the actor stops.
    lost: bool,
    metrics: Arc<EngineMetrics>,
}

impl<T: Transport> EngineActor<T> {
    async fn run(mut self) {
        self.connect().await;

        let period = self.config.sweep_interval;
        let mut sweep = interval_at(Instant::now() + period, period);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if self.lost {
                debug!("No connection left, stopping engine");
                self.shutdown().await;
                break;
            }

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(EngineCommand::Send { method, params, reply }) => {
                        self.submit(method, params, Caller::External(reply)).await;
                    }
                    Some(EngineCommand::Close { reply }) => {
                        self.shutdown().await;
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        debug!("All engine handles dropped");
                        self.shutdown().await;
                        break;
                    }
                },
                event = next_event(&mut self.events) => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        self.events = None;
                        self.on_close(Some("transport went away".into()));
                    }
                },
                _ = next_tick(&mut self.keepalive) => {
                    self.submit(
                        KEEPALIVE_METHOD.to_owned(),
                        Params::none(),
                        Caller::Internal(InternalCall::Keepalive),
                    )
                    .await;
                }
                _ = sweep.tick() => self.sweep_expired(),
                _ = wait_until(self.reconnect_at) => {
                    self.reconnect_at = None;
                    self.connect().await;
                }
            }
        }
    }

    fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            debug!(from = %state, to = %next, "Connection state changed");
            *state = next;
            true
        });
    }

    async fn connect(&mut self) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        self.events = Some(rx);
        self.set_state(ConnectionState::Connecting);

        if let Err(e) = self.transport.open(tx).await {
            self.observer.on_error(&e);
            self.events = None;
            self.on_close(Some(e.to_string()));
        }
    }

    /// Allocate an identifier and either send now or hold until open.
    async fn submit(&mut self, method: String, params: Params, caller: Caller) {
        let id = next_free_id(&mut self.ids, &self.pending, &self.holding);
        let deadline = self.config.request_timeout.map(|t| Instant::now() + t);
        let request = Request::new(id, method.clone(), params);
        let call = PendingCall::new(method, caller, deadline);

        if self.current_state().is_connected() {
            self.dispatch(request, call).await;
        } else {
            debug!(id = %id, method = %request.method, "Connection not open, holding request");
            self.metrics.record_request_queued();
            self.holding.enqueue(request, call);
        }
    }

    /// Write a request and register it as pending.
    async fn dispatch(&mut self, request: Request, call: PendingCall) {
        let id = request.id;
        let frame = match request.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                call.resolve(id, Err(e.into()));
                return;
            }
        };

        self.observer.on_frame_sent(&frame);
        match self.transport.send(frame).await {
            Ok(()) => {
                self.metrics.record_request_sent();
                self.pending.register(id, call);
            }
            Err(e) => {
                warn!(id = %id, method = %request.method, error = %e, "Failed to send request");
                call.resolve(id, Err(RpcError::Transport(e)));
            }
        }
    }

    async fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Open => self.on_open().await,
            TransportEvent::Message(raw) => self.handle_message(&raw),
            TransportEvent::Error(e) => self.observer.on_error(&e),
            TransportEvent::Close { reason } => self.on_close(reason),
        }
    }

    async fn on_open(&mut self) {
        if self.current_state().is_connected() {
            debug!("Ignoring duplicate open");
            return;
        }

        self.reconnect_attempts = 0;
        self.set_state(ConnectionState::Connected);
        self.metrics.record_connection_opened();
        self.observer.on_open(self.transport.endpoint());

        // First ping goes out one full period after open
        let period = self.config.keepalive_interval;
        let mut keepalive = interval_at(Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.keepalive = Some(keepalive);

        for (method, params) in self.bootstrap.clone() {
            self.submit(method, params, Caller::Internal(InternalCall::Bootstrap))
                .await;
        }

        let held = self.holding.drain();
        if !held.is_empty() {
            debug!(count = held.len(), "Sending held requests");
        }
        for queued in held {
            self.dispatch(queued.request, queued.call).await;
        }
    }

    fn handle_message(&mut self, raw: &str) {
        self.observer.on_frame_received(raw);

        match InboundFrame::parse(raw) {
            Ok(InboundFrame::Result { id, result }) => self.complete(id, Ok(result)),
            Ok(InboundFrame::Error { id, error }) => {
                self.metrics.record_remote_error();
                match id {
                    Some(id) => {
                        let failure = self.exceptions.classify(error.code, &error.message);
                        self.complete(id, Err(failure));
                    }
                    None => {
                        warn!(code = error.code, message = %error.message, "Remote error without identifier");
                    }
                }
            }
            Ok(InboundFrame::Unsolicited) => {
                self.metrics.record_unsolicited();
                debug!("Ignoring unsolicited frame");
            }
            Err(e) => {
                self.metrics.record_malformed();
                warn!(error = %e, "Dropping malformed frame");
            }
        }
    }

    fn complete(&mut self, id: RequestId, outcome: CallResult) {
        match self.pending.take(&id) {
            Some(call) => {
                self.metrics.record_response();
                call.resolve(id, outcome);
            }
            None => {
                self.metrics.record_unsolicited();
                debug!(id = %id, "No pending request for response");
            }
        }
    }

    fn on_close(&mut self, reason: Option<String>) {
        let was_connected = self.current_state().is_connected();

        self.events = None;
        self.keepalive = None;
        self.set_state(ConnectionState::Disconnected);
        self.observer.on_close(reason.as_deref());

        if was_connected {
            self.metrics.record_connection_lost();
        }

        for (id, call) in self.pending.drain() {
            call.resolve(id, Err(RpcError::ConnectionClosed));
        }

        let policy = &self.config.reconnect;
        if policy.is_enabled() && self.reconnect_attempts < policy.max_attempts {
            self.reconnect_attempts += 1;
            let delay = policy.delay_for(self.reconnect_attempts);
            info!(
                attempt = self.reconnect_attempts,
                max_attempts = policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting"
            );
            self.reconnect_at = Some(Instant::now() + delay);
            return;
        }

        warn!(
            held = self.holding.len(),
            "Connection lost, no further attempts will be made"
        );
        self.lost = true;
        for queued in self.holding.drain() {
            queued
                .call
                .resolve(queued.request.id, Err(RpcError::NotConnected));
        }
    }

    fn sweep_expired(&mut self) {
        let now = Instant::now();
        let mut expired = self.pending.remove_expired(now);
        expired.extend(self.holding.remove_expired(now));

        for (id, call) in expired {
            self.metrics.record_timeout();
            warn!(id = %id, method = %call.method, "Request timed out");
            let method = call.method.clone();
            call.resolve(id, Err(RpcError::Timeout { id, method }));
        }
    }

    async fn shutdown(&mut self) {
        let was_connected = self.current_state().is_connected();

        self.lost = true;
        self.keepalive = None;
        self.reconnect_at = None;
        // Drop the receiver first so the transport never blocks on it
        self.events = None;

        if let Err(e) = self.transport.close().await {
            self.observer.on_error(&e);
        }
        self.set_state(ConnectionState::Disconnected);
        if was_connected {
            self.observer.on_close(None);
        }

        let outstanding = self.pending.len() + self.holding.len();
        for (id, call) in self.pending.drain() {
            call.resolve(id, Err(RpcError::ConnectionClosed));
        }
        for queued in self.holding.drain() {
            queued
                .call
                .resolve(queued.request.id, Err(RpcError::ConnectionClosed));
        }

        info!(outstanding, "Engine closed");
    }
}

/// Next identifier not currently pending or held.
///
/// Only matters after wraparound, when a very old call may still be
/// waiting on a low identifier.
fn next_free_id(ids: &mut IdGenerator, pending: &PendingTable, holding: &HoldingQueue) -> RequestId {
    loop {
        let id = ids.next_id();
        if !pending.contains(&id) && !holding.contains(&id) {
            return id;
        }
        warn!(id = %id, "Identifier still outstanding, skipping");
    }
}

async fn next_event(events: &mut Option<mpsc::Receiver<TransportEvent>>) -> Option<TransportEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => pending().await,
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
