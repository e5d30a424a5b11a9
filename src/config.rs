//! # Subscription group configuration.
//!
//! [`GroupSettings`] defines the sizing of one subscription group: how many
//! messages a fetch requests, how deep the per-queue and merged channels are,
//! and how many dispatch workers drain the merged channel.
//!
//! Settings are immutable once a group is constructed. The bus keeps one
//! default instance and optional per-group overrides
//! (see [`Bus::with_group_settings`](crate::Bus::with_group_settings)).
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use quebus::GroupSettings;
//!
//! let mut settings = GroupSettings::default();
//! settings.concurrency_limit = 4;
//! settings.read_timeout = Duration::from_secs(30);
//!
//! assert_eq!(settings.concurrency_limit, 4);
//! ```

use std::time::Duration;

/// Sizing and timing configuration for one subscription group.
///
/// Controls prefetch depth, channel capacities, worker concurrency, and
/// receive timing. Captured at group-build time; never mutated afterwards.
#[derive(Clone, Debug)]
pub struct GroupSettings {
    /// Maximum number of messages requested per fetch call.
    pub prefetch: usize,
    /// Capacity of each receive buffer's bounded output channel.
    pub buffer_size: usize,
    /// Capacity of the multiplexer's merged output channel.
    pub multiplexer_capacity: usize,
    /// Number of dispatch workers draining the merged channel.
    pub concurrency_limit: usize,
    /// Upper bound on a single fetch call. Elapsing is treated as an empty
    /// poll, not an error.
    pub read_timeout: Duration,
    /// Long-poll wait time passed through to the queue source on each fetch.
    pub wait_time: Duration,
}

impl Default for GroupSettings {
    /// Provides defaults matching a modest consumer:
    /// - `prefetch = 10`
    /// - `buffer_size = 10`
    /// - `multiplexer_capacity = 100`
    /// - `concurrency_limit = 8`
    /// - `read_timeout = 5m`
    /// - `wait_time = 20s`
    fn default() -> Self {
        Self {
            prefetch: 10,
            buffer_size: 10,
            multiplexer_capacity: 100,
            concurrency_limit: 8,
            read_timeout: Duration::from_secs(300),
            wait_time: Duration::from_secs(20),
        }
    }
}

impl GroupSettings {
    /// Clamps sizing fields to their minimum viable values.
    ///
    /// Channel capacities and worker counts of zero would stall the pipeline;
    /// the bus normalizes settings through this before building a group.
    pub(crate) fn normalized(mut self) -> Self {
        self.prefetch = self.prefetch.max(1);
        self.buffer_size = self.buffer_size.max(1);
        self.multiplexer_capacity = self.multiplexer_capacity.max(1);
        self.concurrency_limit = self.concurrency_limit.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let s = GroupSettings::default();
        assert_eq!(s.prefetch, 10);
        assert_eq!(s.buffer_size, 10);
        assert_eq!(s.multiplexer_capacity, 100);
        assert_eq!(s.concurrency_limit, 8);
    }

    #[test]
    fn normalized_clamps_zeroes() {
        let s = GroupSettings {
            prefetch: 0,
            buffer_size: 0,
            multiplexer_capacity: 0,
            concurrency_limit: 0,
            ..GroupSettings::default()
        }
        .normalized();
        assert_eq!(s.prefetch, 1);
        assert_eq!(s.buffer_size, 1);
        assert_eq!(s.multiplexer_capacity, 1);
        assert_eq!(s.concurrency_limit, 1);
    }
}
