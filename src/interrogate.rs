//! # Interrogation: read-only status snapshots.
//!
//! Every pipeline component exposes an `interrogate()` returning one of these
//! structs. They capture **configured** state (queue identity, capacities,
//! concurrency), not live counters, and exist for diagnostics and health
//! endpoints — never for control flow.
//!
//! All snapshots derive `serde::Serialize` so a health endpoint can render
//! them as JSON directly.

use serde::Serialize;

/// Snapshot of one receive buffer's configuration.
#[derive(Clone, Debug, Serialize)]
pub struct BufferStatus {
    /// Queue the buffer polls.
    pub queue_name: String,
    /// Region of the queue.
    pub region: String,
    /// Messages requested per fetch.
    pub prefetch: usize,
    /// Capacity of the buffer's bounded output channel.
    pub buffer_size: usize,
    /// Name of the configured backoff strategy, if any.
    pub backoff_strategy: Option<String>,
}

/// Snapshot of one multiplexer's configuration.
#[derive(Clone, Debug, Serialize)]
pub struct MultiplexerStatus {
    /// Capacity of the merged output channel.
    pub capacity: usize,
    /// Number of registered source channels.
    pub source_count: usize,
}

/// Aggregated snapshot of one subscription group.
#[derive(Clone, Debug, Serialize)]
pub struct GroupStatus {
    /// Group name.
    pub name: String,
    /// Number of dispatch workers.
    pub concurrency_limit: usize,
    /// Multiplexer snapshot.
    pub multiplexer: MultiplexerStatus,
    /// One snapshot per receive buffer in the group.
    pub receive_buffers: Vec<BufferStatus>,
}

/// Top-level snapshot across all groups of a bus.
#[derive(Clone, Debug, Serialize)]
pub struct BusStatus {
    /// One snapshot per subscription group.
    pub groups: Vec<GroupStatus>,
}
