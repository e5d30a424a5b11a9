//! # ReceiveBuffer: polls one remote queue into a bounded channel.
//!
//! One buffer owns one [`QueueSource`] and continuously fetches batches,
//! publishing each message into its bounded output channel, one at a time.
//! The channel's capacity is the backpressure point: when dispatch is slow,
//! `reserve()` blocks and the buffer stops pulling from the remote queue.
//!
//! ## Loop
//! ```text
//! loop {
//!   ├─► reserve() output-channel slot      (throttle measured, cancellable)
//!   ├─► fetch up to prefetch messages      (middleware chain, read timeout)
//!   │     ├─ timeout  → empty poll, continue
//!   │     ├─ transient error → log, continue
//!   │     └─ fatal error → terminate THIS buffer only
//!   └─► publish each as MessageContext     (can block under backpressure)
//! }
//! on exit: channel closes (sender dropped) → downstream observes end-of-stream
//! ```
//!
//! ## Rules
//! - An empty fetch result is "no messages, retry immediately" — no delay owed.
//! - The requested-attribute set is fixed at construction: the
//!   approximate-receive-count attribute is requested only when a backoff
//!   strategy is configured.
//! - Cancellation is honored at the reserve point, the publish point, and
//!   inside the fetch; in all cases the buffer stops fetching and closes its
//!   channel. Messages fetched but not yet published are dropped and will be
//!   redelivered by the remote queue (at-least-once).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::GroupSettings;
use crate::error::{BusError, SourceError};
use crate::interrogate::BufferStatus;
use crate::middleware::{FetchContext, FetchFuture, MiddlewareChain};
use crate::monitor::Monitor;
use crate::policies::BackoffStrategy;
use crate::sources::{MessageContext, QueueSource, RawMessage, ATTR_APPROXIMATE_RECEIVE_COUNT};

/// Polls one queue source and feeds a bounded channel of [`MessageContext`]s.
pub struct ReceiveBuffer {
    source: Arc<dyn QueueSource>,
    prefetch: usize,
    buffer_size: usize,
    read_timeout: Duration,
    wait_time: Duration,
    middleware: MiddlewareChain,
    monitor: Arc<dyn Monitor>,
    backoff_name: Option<String>,
    attribute_names: Arc<Vec<String>>,
    tx: mpsc::Sender<MessageContext>,
}

impl ReceiveBuffer {
    /// Builds a buffer for `source` and returns it with the readable end of
    /// its output channel (to be registered with a multiplexer).
    pub fn new(
        settings: &GroupSettings,
        source: Arc<dyn QueueSource>,
        middleware: MiddlewareChain,
        monitor: Arc<dyn Monitor>,
        backoff: Option<&Arc<dyn BackoffStrategy>>,
    ) -> (Self, mpsc::Receiver<MessageContext>) {
        let (tx, rx) = mpsc::channel(settings.buffer_size.max(1));

        // Attribute set is fixed here, once. Buffers without a backoff
        // strategy have no use for the receive count.
        let mut attribute_names = Vec::new();
        if backoff.is_some() {
            attribute_names.push(ATTR_APPROXIMATE_RECEIVE_COUNT.to_string());
        }

        let buffer = Self {
            source,
            prefetch: settings.prefetch.max(1),
            buffer_size: settings.buffer_size.max(1),
            read_timeout: settings.read_timeout,
            wait_time: settings.wait_time,
            middleware,
            monitor,
            backoff_name: backoff.map(|s| s.name().to_string()),
            attribute_names: Arc::new(attribute_names),
            tx,
        };
        (buffer, rx)
    }

    /// Static-config snapshot for diagnostics.
    pub fn interrogate(&self) -> BufferStatus {
        BufferStatus {
            queue_name: self.source.queue_name().to_string(),
            region: self.source.region().to_string(),
            prefetch: self.prefetch,
            buffer_size: self.buffer_size,
            backoff_strategy: self.backoff_name.clone(),
        }
    }

    /// Runs the receive loop until cancellation or a fatal source error.
    ///
    /// Consumes the buffer; the output channel closes when this returns, so
    /// downstream consumers observe end-of-stream and drain gracefully.
    pub async fn run(self, token: CancellationToken) -> Result<(), BusError> {
        let queue = self.source.queue_name().to_string();
        let result = self.poll_loop(&token).await;

        match &result {
            Ok(()) => info!(queue, "receive buffer completed, closing channel"),
            Err(err) => error!(queue, error = %err, "receive buffer failed, closing channel"),
        }
        result.map_err(|source| BusError::ReceiveBufferFailed { queue, source })
    }

    async fn poll_loop(&self, token: &CancellationToken) -> Result<(), SourceError> {
        loop {
            if token.is_cancelled() {
                return Ok(());
            }

            // Backpressure point: no fetch is issued until the output channel
            // has room for at least one message.
            let throttle_started = Instant::now();
            let permit = tokio::select! {
                _ = token.cancelled() => return Ok(()),
                reserved = self.tx.reserve() => match reserved {
                    Ok(permit) => permit,
                    // All receivers gone; nothing left to feed.
                    Err(_) => return Ok(()),
                },
            };
            // The select above is unbiased: when cancellation and channel
            // capacity become ready together it may still hand out a permit.
            // Re-check so no fetch starts after the signal.
            if token.is_cancelled() {
                return Ok(());
            }
            self.monitor.throttled(throttle_started.elapsed());

            let messages = match self.fetch_batch(token).await {
                Ok(messages) => messages,
                Err(SourceError::Cancelled) => return Ok(()),
                Err(err) if err.is_transient() => {
                    warn!(
                        queue = self.source.queue_name(),
                        error = %err,
                        "transient receive error, retrying"
                    );
                    continue;
                }
                Err(err) => return Err(err),
            };

            let mut messages = messages.into_iter();
            match messages.next() {
                Some(first) => {
                    permit.send(MessageContext::new(first, Arc::clone(&self.source)));
                }
                None => continue,
            }

            for message in messages {
                let ctx = MessageContext::new(message, Arc::clone(&self.source));
                tokio::select! {
                    _ = token.cancelled() => return Ok(()),
                    sent = self.tx.send(ctx) => {
                        if sent.is_err() {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// One fetch through the middleware chain, bounded by the read timeout.
    ///
    /// An elapsed read timeout is an empty poll, not an error. Receive
    /// duration is recorded on every path.
    async fn fetch_batch(&self, token: &CancellationToken) -> Result<Vec<RawMessage>, SourceError> {
        let started = Instant::now();
        let cx = FetchContext {
            queue_name: self.source.queue_name().to_string(),
            region: self.source.region().to_string(),
            count: self.prefetch,
        };

        let source = Arc::clone(&self.source);
        let attribute_names = Arc::clone(&self.attribute_names);
        let fetch_token = token.clone();
        let max_count = self.prefetch;
        let wait_time = self.wait_time;
        let terminal = move || -> FetchFuture {
            let source = Arc::clone(&source);
            let attribute_names = Arc::clone(&attribute_names);
            let token = fetch_token.clone();
            Box::pin(async move {
                source
                    .fetch(max_count, wait_time, &attribute_names, &token)
                    .await
            })
        };

        let result = match time::timeout(self.read_timeout, self.middleware.run(&cx, &terminal))
            .await
        {
            Ok(fetched) => fetched,
            Err(_elapsed) => {
                info!(
                    queue = self.source.queue_name(),
                    region = self.source.region(),
                    "timed out while receiving messages"
                );
                Ok(Vec::new())
            }
        };

        self.monitor.receive_completed(
            self.source.queue_name(),
            self.source.region(),
            started.elapsed(),
        );
        result
    }
}
