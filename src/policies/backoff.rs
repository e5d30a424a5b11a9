//! # Backoff strategy for requeued messages.
//!
//! A [`BackoffStrategy`] maps a message's approximate receive count to an
//! explicit requeue delay. The dispatch stage consults it when a handler
//! fails; the receive stage uses its presence to decide whether to request
//! the receive-count attribute, and reports its [`name`](BackoffStrategy::name)
//! in interrogation snapshots.
//!
//! [`ExponentialBackoff`] is the built-in implementation. The delay for a
//! message received `n` times is `first × factor^(n−1)`, clamped to `max`,
//! with optional [`Jitter`] applied afterwards. The base delay is derived
//! purely from the receive count reported by the remote queue, so jitter
//! output never feeds back into later calculations.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use quebus::{BackoffStrategy, ExponentialBackoff, Jitter};
//!
//! let backoff = ExponentialBackoff {
//!     first: Duration::from_secs(1),
//!     max: Duration::from_secs(60),
//!     factor: 2.0,
//!     jitter: Jitter::None,
//! };
//!
//! // First delivery failed — redeliver after `first`.
//! assert_eq!(backoff.delay(1), Duration::from_secs(1));
//! // Third delivery failed — 1s × 2² = 4s.
//! assert_eq!(backoff.delay(3), Duration::from_secs(4));
//! // Deep retry — capped at max.
//! assert_eq!(backoff.delay(30), Duration::from_secs(60));
//! ```

use std::time::Duration;

use crate::policies::Jitter;

/// Pluggable policy computing a requeue delay from a message's approximate
/// receive count.
///
/// Stateless per invocation: implementations must derive the delay from the
/// given count alone, so concurrent dispatch workers can share one instance.
pub trait BackoffStrategy: Send + Sync + 'static {
    /// Short stable strategy name, reported by buffer interrogation.
    fn name(&self) -> &'static str;

    /// Computes the requeue delay for a message received
    /// `approximate_receive_count` times (1-based; 0 is treated as 1).
    fn delay(&self, approximate_receive_count: u32) -> Duration;
}

/// Exponential requeue backoff.
///
/// Encapsulates the parameters that determine how redelivery delays grow:
/// - [`ExponentialBackoff::factor`] — multiplicative growth factor;
/// - [`ExponentialBackoff::first`] — delay after the first failed delivery;
/// - [`ExponentialBackoff::max`] — the maximum delay cap.
#[derive(Clone, Copy, Debug)]
pub struct ExponentialBackoff {
    /// Delay after the first failed delivery.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter applied to the clamped base delay.
    pub jitter: Jitter,
}

impl Default for ExponentialBackoff {
    /// Returns a strategy with:
    /// - `first = 1s`;
    /// - `factor = 2.0`;
    /// - `max = 5m`;
    /// - `jitter = None`.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            max: Duration::from_secs(300),
            factor: 2.0,
            jitter: Jitter::None,
        }
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn name(&self) -> &'static str {
        "exponential"
    }

    /// `first × factor^(count−1)`, clamped to [`ExponentialBackoff::max`],
    /// then jittered. Non-finite or overflowing intermediates clamp to `max`.
    fn delay(&self, approximate_receive_count: u32) -> Duration {
        let exponent = approximate_receive_count.saturating_sub(1);
        let max_secs = self.max.as_secs_f64();
        let clamped_exp = exponent.min(i32::MAX as u32) as i32;
        let unclamped_secs = self.first.as_secs_f64() * self.factor.powi(clamped_exp);

        let base =
            if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs {
                self.max
            } else {
                Duration::from_secs_f64(unclamped_secs)
            };

        self.jitter.apply(base)
    }
}
