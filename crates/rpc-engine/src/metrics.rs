//! Counters for engine activity.
//!
//! The engine actor records into an [`EngineMetrics`] shared with every
//! handle; readers take a [`MetricsSnapshot`].
//!
//! ## Usage
//!
//! ```ignore
//! let engine = RpcEngine::connect(EngineConfig::default())?;
//! engine.send("ping", ()).await?;
//!
//! let snapshot = engine.metrics();
//! assert_eq!(snapshot.responses_received, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe engine counters
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Frames written to the transport
    pub requests_sent: AtomicU64,
    /// Calls parked in the holding queue
    pub requests_queued: AtomicU64,
    /// Inbound replies matched to a pending call
    pub responses_received: AtomicU64,
    /// Inbound error objects
    pub remote_errors: AtomicU64,
    /// Calls failed by the deadline sweep
    pub timeouts: AtomicU64,
    /// Frames with no matching pending call
    pub unsolicited_frames: AtomicU64,
    /// Frames that could not be parsed
    pub malformed_frames: AtomicU64,
    pub connections_opened: AtomicU64,
    /// Unrequested closes of an open connection
    pub connection_losses: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request_sent(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request_queued(&self) {
        self.requests_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_response(&self) {
        self.responses_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote_error(&self) {
        self.remote_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unsolicited(&self) {
        self.unsolicited_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_lost(&self) {
        self.connection_losses.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            requests_queued: self.requests_queued.load(Ordering::Relaxed),
            responses_received: self.responses_received.load(Ordering::Relaxed),
            remote_errors: self.remote_errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            unsolicited_frames: self.unsolicited_frames.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connection_losses: self.connection_losses.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`EngineMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests_sent: u64,
    pub requests_queued: u64,
    pub responses_received: u64,
    pub remote_errors: u64,
    pub timeouts: u64,
    pub unsolicited_frames: u64,
    pub malformed_frames: u64,
    pub connections_opened: u64,
    pub connection_losses: u64,
}
