//! The receive/multiplex/dispatch pipeline.
//!
//! This module contains the concurrent core of the bus: per-queue receive
//! buffering, channel fan-in, and the concurrency-limited dispatch pool,
//! plus the group/collection types that run them as cancelable units.
//!
//! ## Contents
//! - [`ReceiveBuffer`]: polls one queue into a bounded channel (backpressure)
//! - [`Multiplexer`] / [`MergedReader`]: fans N channels into one
//! - [`DispatchWorker`]: one concurrency slot of the handling contract
//! - [`SubscriptionGroup`]: buffers + multiplexer + workers as one unit
//! - [`SubscriptionGroupCollection`]: all groups of a bus
//!
//! ## Data flow
//! ```text
//! QueueSource ─► ReceiveBuffer ─► Multiplexer ─► DispatchWorker ─► Handler
//!                 (bounded)        (bounded)         │
//!                                                    └─► delete / requeue
//! ```
//!
//! See `lib.rs` for the system-level wiring diagram.

mod collection;
mod dispatch;
mod group;
mod multiplexer;
mod receive;

pub use collection::SubscriptionGroupCollection;
pub use dispatch::DispatchWorker;
pub use group::SubscriptionGroup;
pub use multiplexer::{MergedReader, Multiplexer};
pub use receive::ReceiveBuffer;
