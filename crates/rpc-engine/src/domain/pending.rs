//! Pending Caller Table and Holding Queue.
//!
//! Both map a [`RequestId`] to the continuation that completes a `send`.
//! The pending table holds calls already written to the transport; the
//! holding queue holds calls issued before the connection was ready, in
//! identifier order, until they are drained on open.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::identifier::RequestId;
use super::messages::Request;
use crate::error::RpcError;

/// Outcome delivered to a caller.
pub type CallResult = Result<Value, RpcError>;

/// Requests the engine issues on its own behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalCall {
    Keepalive,
    Bootstrap,
}

/// Who is waiting for a call.
#[derive(Debug)]
pub enum Caller {
    External(oneshot::Sender<CallResult>),
    Internal(InternalCall),
}

/// A call waiting for its response.
#[derive(Debug)]
pub struct PendingCall {
    pub method: String,
    pub caller: Caller,
    pub submitted_at: Instant,
    pub deadline: Option<Instant>,
}

impl PendingCall {
    pub fn new(method: impl Into<String>, caller: Caller, deadline: Option<Instant>) -> Self {
        Self {
            method: method.into(),
            caller,
            submitted_at: Instant::now(),
            deadline,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(deadline) if now >= deadline)
    }

    /// Complete the call. Returns `false` when nobody was listening anymore.
    pub fn resolve(self, id: RequestId, outcome: CallResult) -> bool {
        match self.caller {
            Caller::External(reply) => {
                let delivered = reply.send(outcome).is_ok();
                if !delivered {
                    debug!(id = %id, method = %self.method, "Caller went away before completion");
                }
                delivered
            }
            Caller::Internal(kind) => {
                match outcome {
                    Ok(_) => trace!(id = %id, method = %self.method, ?kind, "Internal request completed"),
                    Err(e) => warn!(id = %id, method = %self.method, ?kind, error = %e, "Internal request failed"),
                }
                true
            }
        }
    }
}

/// Identifier -> continuation for calls already sent.
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: HashMap<RequestId, PendingCall>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sent call. At most one entry per identifier.
    pub fn register(&mut self, id: RequestId, call: PendingCall) {
        debug_assert!(
            !self.entries.contains_key(&id),
            "identifier {id} registered twice"
        );
        self.entries.insert(id, call);
    }

    /// Remove the entry for `id`.
    pub fn take(&mut self, id: &RequestId) -> Option<PendingCall> {
        self.entries.remove(id)
    }

    pub fn contains(&self, id: &RequestId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry.
    pub fn drain(&mut self) -> Vec<(RequestId, PendingCall)> {
        self.entries.drain().collect()
    }

    /// Remove entries whose deadline has passed.
    pub fn remove_expired(&mut self, now: Instant) -> Vec<(RequestId, PendingCall)> {
        let expired: Vec<RequestId> = self
            .entries
            .iter()
            .filter(|(_, call)| call.is_expired(now))
            .map(|(id, _)| *id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| self.entries.remove(&id).map(|call| (id, call)))
            .collect()
    }
}

/// A request parked until the connection opens.
#[derive(Debug)]
pub struct QueuedCall {
    pub request: Request,
    pub call: PendingCall,
}

/// Identifier -> parked request, iterated in identifier order.
#[derive(Debug, Default)]
pub struct HoldingQueue {
    entries: BTreeMap<RequestId, QueuedCall>,
}

impl HoldingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, request: Request, call: PendingCall) {
        let id = request.id;
        debug_assert!(
            !self.entries.contains_key(&id),
            "identifier {id} queued twice"
        );
        self.entries.insert(id, QueuedCall { request, call });
    }

    pub fn contains(&self, id: &RequestId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take every parked request in identifier order.
    pub fn drain(&mut self) -> Vec<QueuedCall> {
        std::mem::take(&mut self.entries).into_values().collect()
    }

    /// Remove parked requests whose deadline has passed.
    pub fn remove_expired(&mut self, now: Instant) -> Vec<(RequestId, PendingCall)> {
        let expired: Vec<RequestId> = self
            .entries
            .iter()
            .filter(|(_, queued)| queued.call.is_expired(now))
            .map(|(id, _)| *id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| self.entries.remove(&id).map(|queued| (id, queued.call)))
            .collect()
    }
}
