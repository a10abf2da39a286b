//! Tracing-backed lifecycle observer.

use tracing::{debug, error, info};

use crate::error::TransportError;
use crate::ports::EngineObserver;

/// Logs connection lifecycle through `tracing`.
///
/// Frame bodies are only logged when `log_frames` is set, since they may
/// carry credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver {
    log_frames: bool,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame_logging(log_frames: bool) -> Self {
        Self { log_frames }
    }

    pub fn logs_frames(&self) -> bool {
        self.log_frames
    }
}

impl EngineObserver for TracingObserver {
    fn on_open(&self, endpoint: &str) {
        info!(endpoint = %endpoint, "Successfully connected");
    }

    fn on_close(&self, reason: Option<&str>) {
        info!(reason = reason.unwrap_or("none"), "Connection closed");
    }

    fn on_error(&self, error: &TransportError) {
        error!(error = %error, "Transport error");
    }

    fn on_frame_sent(&self, frame: &str) {
        if self.log_frames {
            debug!(frame = %frame, "Sending frame");
        }
    }

    fn on_frame_received(&self, frame: &str) {
        if self.log_frames {
            debug!(frame = %frame, "Received frame");
        }
    }
}
