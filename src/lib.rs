//! # quebus
//!
//! **quebus** is a client-side message-bus runtime for Rust.
//!
//! It consumes messages from multiple remote queues, multiplexes them into
//! shared processing capacity, and dispatches each message to an
//! application-supplied handler under bounded concurrency — with real
//! backpressure end to end, graceful cancellation, and at-least-once
//! delivery.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ QueueSource  │   │ QueueSource  │   │ QueueSource  │
//!     │  ("orders")  │   │ ("payments") │   │  ("audit")   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼    fetch batches ▼ (middleware chain, read timeout)
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ReceiveBuffer │   │ReceiveBuffer │   │ReceiveBuffer │
//!     │ [bounded ch] │   │ [bounded ch] │   │ [bounded ch] │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            └──────────────────┼──────────────────┘
//!                               ▼
//!                  ┌─────────────────────────┐
//!                  │       Multiplexer       │
//!                  │ (fan-in, bounded merge) │
//!                  └────────────┬────────────┘
//!                               ▼
//!              ┌────────────────┼────────────────┐
//!              ▼                ▼                ▼
//!       ┌────────────┐  ┌────────────┐  ┌────────────┐
//!       │ Dispatch   │  │ Dispatch   │  │ Dispatch   │
//!       │ Worker 1   │  │ Worker 2   │  │ Worker M   │
//!       └──────┬─────┘  └──────┬─────┘  └──────┬─────┘
//!              ▼               ▼               ▼
//!       HandlerRegistry.resolve(queue) → handler.handle(ctx)
//!              │ Ok  → ctx.delete()   (acknowledge at source)
//!              └ Err → ctx.requeue(backoff.delay(receive_count))
//! ```
//!
//! One [`SubscriptionGroup`] owns a set of buffers, one multiplexer, and a
//! worker pool, run and cancelled as a unit; a
//! [`SubscriptionGroupCollection`] runs every group of a bus. All of it is
//! driven by cooperative tasks on the shared tokio scheduler — no component
//! manages its own thread.
//!
//! ### Guarantees
//! - **Backpressure**: every channel is bounded; a slow handler stalls the
//!   fetch loop instead of growing memory.
//! - **At-least-once**: a message is deleted from its source only after a
//!   successful handler outcome; every earlier failure leaves it for
//!   redelivery.
//! - **Ordering**: per-queue receive order is preserved up to the
//!   multiplexer; no ordering across queues or across workers.
//! - **Isolation**: a failing handler never kills its worker; a fatally
//!   failing buffer never kills its siblings; the first error surfaces only
//!   after the whole group has drained.
//! - **Cancellation**: one [`CancellationToken`](tokio_util::sync::CancellationToken)
//!   threads through every suspension point; in-flight handling always
//!   finishes before a worker exits.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use quebus::{Bus, ExponentialBackoff, HandlerError, HandlerFn, LogMonitor};
//! # fn sqs_source(_name: &str) -> Arc<dyn quebus::QueueSource> { unimplemented!() }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), quebus::BusError> {
//!     let mut bus = Bus::new();
//!     bus.set_monitor(Arc::new(LogMonitor::new()));
//!     bus.set_backoff(Arc::new(ExponentialBackoff::default()));
//!
//!     bus.add_queue("eu-west-1", "default", sqs_source("orders"));
//!     bus.add_message_handler("orders", HandlerFn::factory(|msg| async move {
//!         println!("order received: {}", msg.body);
//!         Ok::<(), HandlerError>(())
//!     }));
//!
//!     // Runs until SIGINT/SIGTERM, then drains gracefully.
//!     bus.run_until_shutdown().await
//! }
//! ```

mod bus;
mod config;
mod error;
mod interrogate;
mod shutdown;

pub mod channels;
pub mod handlers;
pub mod middleware;
pub mod monitor;
pub mod policies;
pub mod sources;

// ---- Public re-exports ----

pub use bus::Bus;
pub use channels::{
    DispatchWorker, MergedReader, Multiplexer, ReceiveBuffer, SubscriptionGroup,
    SubscriptionGroupCollection,
};
pub use config::GroupSettings;
pub use error::{BusError, HandlerError, SourceError};
pub use handlers::{Handler, HandlerFactory, HandlerFn, HandlerRegistry};
pub use interrogate::{BufferStatus, BusStatus, GroupStatus, MultiplexerStatus};
pub use middleware::{FetchContext, FetchFuture, MiddlewareChain, Next, ReceiveMiddleware};
pub use monitor::{HandleOutcome, LogMonitor, Monitor, NoopMonitor};
pub use policies::{BackoffStrategy, ExponentialBackoff, Jitter};
pub use sources::{MessageContext, QueueSource, RawMessage, ATTR_APPROXIMATE_RECEIVE_COUNT};
