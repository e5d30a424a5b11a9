//! Message handlers: the application seam of the pipeline.
//!
//! ## Contents
//! - [`Handler`] async trait invoked once per dispatched message
//! - [`HandlerFactory`] zero-argument factory producing a handler instance
//! - [`HandlerRegistry`] queue-name → factory map with a two-phase lifecycle
//!
//! ## Lifecycle
//! The registry is mutated only while the bus is being configured. `Bus::run`
//! validates it against the subscribed queues (fail fast on a missing
//! handler), wraps it in an `Arc`, and from then on it is read-only, shared by
//! every dispatch worker.

mod handler;
mod registry;

pub use handler::{Handler, HandlerFactory, HandlerFn};
pub use registry::HandlerRegistry;
