//! # Monitoring seam for the pipeline.
//!
//! [`Monitor`] receives timing and outcome signals from receive buffers and
//! dispatch workers. It is the runtime's only observability dependency; wire
//! it to metrics, or use [`LogMonitor`] to emit `tracing` events, or
//! [`NoopMonitor`] to discard everything.
//!
//! ## Rules
//! - Every method must tolerate **concurrent** invocation: all dispatch
//!   workers and all receive buffers share one instance.
//! - Callbacks are synchronous and must be cheap; they sit on the hot path.
//! - Dispatch records an outcome for **every** message, including panics and
//!   acknowledgement failures — the recording path is never skipped.

use std::time::Duration;

use tracing::{debug, info};

/// Terminal outcome of handling one message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Handler succeeded and the message was acknowledged.
    Handled,
    /// Handler failed (error or panic); message left for redelivery.
    Failed,
}

/// Receives timing and outcome signals from the pipeline.
///
/// All methods have no-op defaults so implementations only override what they
/// record.
pub trait Monitor: Send + Sync + 'static {
    /// A receive buffer spent `duration` waiting for output-channel capacity
    /// before it could fetch (the backpressure stall).
    fn throttled(&self, duration: Duration) {
        let _ = duration;
    }

    /// One fetch call against `queue` in `region` completed in `duration`.
    fn receive_completed(&self, queue: &str, region: &str, duration: Duration) {
        let _ = (queue, region, duration);
    }

    /// One message from `queue` finished handling with `outcome` after
    /// `duration` of handler time.
    fn message_handled(&self, queue: &str, outcome: HandleOutcome, duration: Duration) {
        let _ = (queue, outcome, duration);
    }
}

/// Discards all signals.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMonitor;

impl Monitor for NoopMonitor {}

/// Emits every signal as a `tracing` event.
///
/// Receives and outcomes log at `debug`, handler failures at `info`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogMonitor;

impl LogMonitor {
    /// Construct a new [`LogMonitor`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Monitor for LogMonitor {
    fn throttled(&self, duration: Duration) {
        debug!(?duration, "receive buffer throttled on channel capacity");
    }

    fn receive_completed(&self, queue: &str, region: &str, duration: Duration) {
        debug!(queue, region, ?duration, "receive completed");
    }

    fn message_handled(&self, queue: &str, outcome: HandleOutcome, duration: Duration) {
        match outcome {
            HandleOutcome::Handled => {
                debug!(queue, ?duration, "message handled");
            }
            HandleOutcome::Failed => {
                info!(queue, ?duration, "message handling failed");
            }
        }
    }
}
