//! # Multiplexer: fans N per-queue channels into one merged channel.
//!
//! The merge step is what lets a fixed, small worker pool serve an arbitrary
//! number of subscribed queues without per-queue worker allocation.
//!
//! ## Architecture
//! ```text
//! buffer 1 ──► [rx 1] ──► forwarder 1 ──┐
//! buffer 2 ──► [rx 2] ──► forwarder 2 ──┼──► merged bounded channel ──► workers
//! buffer N ──► [rx N] ──► forwarder N ──┘
//! ```
//!
//! ## Rules
//! - All sources must be registered **before** `run`; `run` consumes the
//!   multiplexer, so late registration is impossible by construction.
//! - Items from one source keep their relative order; no ordering exists
//!   across sources.
//! - `run` completes only after every forwarder has drained its source; the
//!   merged channel closes at that point so workers observe end-of-stream.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::BusError;
use crate::interrogate::MultiplexerStatus;
use crate::sources::MessageContext;

/// Shared readable end of the merged channel.
///
/// `tokio::sync::mpsc` receivers are single-consumer; wrapping one in an
/// async mutex lets a pool of dispatch workers compete for messages. A worker
/// holds the lock only for the duration of one `recv`.
#[derive(Clone)]
pub struct MergedReader {
    inner: Arc<Mutex<mpsc::Receiver<MessageContext>>>,
}

impl MergedReader {
    /// Receives the next merged message; `None` once the channel is closed
    /// and drained.
    pub async fn recv(&self) -> Option<MessageContext> {
        self.inner.lock().await.recv().await
    }
}

/// Merges registered source channels into one bounded output channel.
pub struct Multiplexer {
    capacity: usize,
    sources: Vec<mpsc::Receiver<MessageContext>>,
    tx: mpsc::Sender<MessageContext>,
    reader: MergedReader,
}

impl Multiplexer {
    /// Creates a multiplexer whose merged channel holds up to `capacity`
    /// messages.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            capacity,
            sources: Vec::new(),
            tx,
            reader: MergedReader {
                inner: Arc::new(Mutex::new(rx)),
            },
        }
    }

    /// Registers one source channel. Must happen before [`run`](Self::run).
    pub fn register(&mut self, source: mpsc::Receiver<MessageContext>) {
        self.sources.push(source);
    }

    /// Handle to the merged output, shared by all dispatch workers.
    pub fn reader(&self) -> MergedReader {
        self.reader.clone()
    }

    /// Static-config snapshot for diagnostics.
    pub fn interrogate(&self) -> MultiplexerStatus {
        MultiplexerStatus {
            capacity: self.capacity,
            source_count: self.sources.len(),
        }
    }

    /// Runs one forwarder per registered source and completes once all of
    /// them have drained. The merged channel closes when this returns.
    ///
    /// A forwarder exits when its source channel closes (its buffer finished)
    /// or when cancellation fires while the merged channel is full — in the
    /// latter case the unforwarded message is dropped unacknowledged and the
    /// remote queue redelivers it.
    pub async fn run(self, token: CancellationToken) -> Result<(), BusError> {
        let source_count = self.sources.len();
        let mut forwarders = JoinSet::new();

        for mut source in self.sources {
            let tx = self.tx.clone();
            let token = token.clone();
            forwarders.spawn(async move {
                while let Some(ctx) = source.recv().await {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        sent = tx.send(ctx) => {
                            if sent.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }

        // The forwarders hold the only remaining senders once this drops, so
        // the merged channel closes exactly when the last forwarder exits.
        drop(self.tx);

        let mut first_err = None;
        while let Some(joined) = forwarders.join_next().await {
            if let Err(err) = joined {
                if first_err.is_none() {
                    first_err = Some(BusError::Join {
                        reason: err.to_string(),
                    });
                }
            }
        }

        debug!(source_count, "multiplexer completed, merged channel closed");
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::SourceError;
    use crate::sources::{QueueSource, RawMessage};

    struct StubSource {
        name: String,
    }

    #[async_trait]
    impl QueueSource for StubSource {
        fn queue_name(&self) -> &str {
            &self.name
        }
        fn region(&self) -> &str {
            "local"
        }
        fn uri(&self) -> &str {
            "stub://queue"
        }
        async fn fetch(
            &self,
            _max_count: usize,
            _wait_time: Duration,
            _attribute_names: &[String],
            _token: &CancellationToken,
        ) -> Result<Vec<RawMessage>, SourceError> {
            Ok(Vec::new())
        }
        async fn delete(&self, _message: &RawMessage) -> Result<(), SourceError> {
            Ok(())
        }
        async fn change_visibility(
            &self,
            _message: &RawMessage,
            _delay: Duration,
        ) -> Result<(), SourceError> {
            Ok(())
        }
    }

    fn ctx(queue: &str, id: u32) -> MessageContext {
        MessageContext::new(
            RawMessage {
                id: format!("{queue}-{id}"),
                receipt: format!("r-{queue}-{id}"),
                body: String::new(),
                attributes: HashMap::new(),
            },
            Arc::new(StubSource { name: queue.into() }),
        )
    }

    #[tokio::test]
    async fn merges_all_sources_exactly_once() {
        let mut mux = Multiplexer::new(16);
        let (tx_a, rx_a) = mpsc::channel(4);
        let (tx_b, rx_b) = mpsc::channel(4);
        mux.register(rx_a);
        mux.register(rx_b);
        let reader = mux.reader();

        for i in 0..3 {
            tx_a.send(ctx("a", i)).await.unwrap();
            tx_b.send(ctx("b", i)).await.unwrap();
        }
        drop(tx_a);
        drop(tx_b);

        let run = tokio::spawn(mux.run(CancellationToken::new()));

        let mut ids = Vec::new();
        while let Some(received) = reader.recv().await {
            ids.push(received.message().id.clone());
        }
        run.await.unwrap().unwrap();

        ids.sort();
        assert_eq!(ids, vec!["a-0", "a-1", "a-2", "b-0", "b-1", "b-2"]);
    }

    #[tokio::test]
    async fn per_source_order_is_preserved() {
        let mut mux = Multiplexer::new(16);
        let (tx, rx) = mpsc::channel(8);
        mux.register(rx);
        let reader = mux.reader();

        for i in 0..5 {
            tx.send(ctx("q", i)).await.unwrap();
        }
        drop(tx);

        let run = tokio::spawn(mux.run(CancellationToken::new()));
        let mut ids = Vec::new();
        while let Some(received) = reader.recv().await {
            ids.push(received.message().id.clone());
        }
        run.await.unwrap().unwrap();

        assert_eq!(ids, vec!["q-0", "q-1", "q-2", "q-3", "q-4"]);
    }

    #[tokio::test]
    async fn completes_when_all_sources_close() {
        let mut mux = Multiplexer::new(4);
        let (tx, rx) = mpsc::channel(2);
        mux.register(rx);
        let reader = mux.reader();
        drop(tx);

        mux.run(CancellationToken::new()).await.unwrap();
        assert!(reader.recv().await.is_none());
    }

    #[test]
    fn interrogate_reports_capacity_and_sources() {
        let mut mux = Multiplexer::new(32);
        let (_tx, rx) = mpsc::channel(1);
        mux.register(rx);
        let status = mux.interrogate();
        assert_eq!(status.capacity, 32);
        assert_eq!(status.source_count, 1);
    }
}
