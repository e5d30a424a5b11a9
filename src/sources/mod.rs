//! Queue sources: the adapter boundary to remote queues.
//!
//! This module groups the **source abstraction** and the **in-flight message
//! context** that travels through the pipeline channels.
//!
//! ## Contents
//! - [`QueueSource`] async trait abstracting one remote queue (batched fetch,
//!   per-message delete/requeue)
//! - [`RawMessage`] one message as returned by a source
//! - [`MessageContext`] a raw message bound to the source it came from
//!
//! ## Quick reference
//! - **Producers**: `ReceiveBuffer` wraps fetched messages into contexts.
//! - **Consumers**: `DispatchWorker` acknowledges or requeues via the context.

mod context;
mod source;

pub use context::MessageContext;
pub use source::{QueueSource, RawMessage, ATTR_APPROXIMATE_RECEIVE_COUNT};
