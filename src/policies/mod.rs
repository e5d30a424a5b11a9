//! Requeue backoff policies.
//!
//! This module groups the knobs that control **how long** a failed message
//! stays invisible before the remote queue redelivers it.
//!
//! ## Contents
//! - [`BackoffStrategy`] pluggable contract: receive count → requeue delay
//! - [`ExponentialBackoff`] default implementation (first / factor / max + jitter)
//! - [`Jitter`] randomization to avoid synchronized redeliveries
//!
//! ## Quick wiring
//! ```text
//! Bus { backoff: Option<Arc<dyn BackoffStrategy>> }
//!      └─► DispatchWorker uses:
//!           - strategy.delay(approximate_receive_count) on handler failure
//!           - MessageContext::requeue(delay) to apply it
//!      └─► ReceiveBuffer uses:
//!           - strategy presence to request the receive-count attribute
//!           - strategy.name() in its interrogation snapshot
//! ```
//!
//! ## Defaults
//! - No strategy configured → failed messages fall back to the remote queue's
//!   own redelivery timeout.
//! - `ExponentialBackoff::default()` → first=1s, factor=2.0, max=5m, jitter=None.

mod backoff;
mod jitter;

pub use backoff::{BackoffStrategy, ExponentialBackoff};
pub use jitter::Jitter;
