//! # Receive middleware: cross-cutting wrap around the fetch call.
//!
//! Every fetch a [`ReceiveBuffer`](crate::channels::ReceiveBuffer) issues is
//! run through a [`MiddlewareChain`], so metrics, tracing, or fault injection
//! can be layered around the source call without touching the buffer itself.
//!
//! ## Architecture
//! ```text
//! chain.run(cx, terminal)
//!     └─► stage 1 ──► stage 2 ──► ... ──► stage N ──► terminal fetch
//!            │           │                   │             (QueueSource::fetch)
//!            └───────────┴── each stage decides whether/when to call next.run()
//! ```
//!
//! ## Rules
//! - Chain composition is fixed at buffer construction; an empty chain is the
//!   default and calls the terminal fetch directly.
//! - A stage sees the [`FetchContext`] (queue, region, requested count) and
//!   may short-circuit by returning without calling [`Next::run`].

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::SourceError;
use crate::sources::RawMessage;

/// Immutable description of one fetch call, visible to every stage.
#[derive(Clone, Debug)]
pub struct FetchContext {
    /// Queue being polled.
    pub queue_name: String,
    /// Region of the queue.
    pub region: String,
    /// Maximum number of messages requested.
    pub count: usize,
}

/// The innermost fetch operation a chain wraps.
pub type FetchFuture = BoxFuture<'static, Result<Vec<RawMessage>, SourceError>>;

/// One stage wrapping the fetch call.
///
/// A stage runs code before and/or after delegating to [`Next::run`], or
/// skips the delegation entirely to short-circuit the fetch.
#[async_trait]
pub trait ReceiveMiddleware: Send + Sync + 'static {
    /// Wraps one fetch. Call `next.run(cx)` to continue down the chain.
    async fn fetch(
        &self,
        cx: &FetchContext,
        next: Next<'_>,
    ) -> Result<Vec<RawMessage>, SourceError>;
}

/// Continuation handed to each stage: the remaining stages plus the terminal
/// fetch.
pub struct Next<'a> {
    rest: &'a [Arc<dyn ReceiveMiddleware>],
    terminal: &'a (dyn Fn() -> FetchFuture + Send + Sync),
}

impl Next<'_> {
    /// Runs the remainder of the chain, ending at the terminal fetch.
    pub async fn run(self, cx: &FetchContext) -> Result<Vec<RawMessage>, SourceError> {
        match self.rest.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    rest,
                    terminal: self.terminal,
                };
                stage.fetch(cx, next).await
            }
            None => (self.terminal)().await,
        }
    }
}

/// Ordered set of middleware stages applied around every fetch.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    stages: Vec<Arc<dyn ReceiveMiddleware>>,
}

impl MiddlewareChain {
    /// Creates an empty chain (fetches pass straight through).
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage; stages run in the order they were added.
    pub fn with(mut self, stage: Arc<dyn ReceiveMiddleware>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Number of stages in the chain.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs `terminal` through the chain for the given fetch context.
    pub async fn run(
        &self,
        cx: &FetchContext,
        terminal: &(dyn Fn() -> FetchFuture + Send + Sync),
    ) -> Result<Vec<RawMessage>, SourceError> {
        Next {
            rest: &self.stages,
            terminal,
        }
        .run(cx)
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Recording {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ReceiveMiddleware for Recording {
        async fn fetch(
            &self,
            cx: &FetchContext,
            next: Next<'_>,
        ) -> Result<Vec<RawMessage>, SourceError> {
            self.log.lock().unwrap().push(format!("{}:before", self.label));
            let out = next.run(cx).await;
            self.log.lock().unwrap().push(format!("{}:after", self.label));
            out
        }
    }

    struct ShortCircuit;

    #[async_trait]
    impl ReceiveMiddleware for ShortCircuit {
        async fn fetch(
            &self,
            _cx: &FetchContext,
            _next: Next<'_>,
        ) -> Result<Vec<RawMessage>, SourceError> {
            Ok(Vec::new())
        }
    }

    fn cx() -> FetchContext {
        FetchContext {
            queue_name: "orders".into(),
            region: "local".into(),
            count: 10,
        }
    }

    fn one_message() -> FetchFuture {
        Box::pin(async {
            Ok(vec![RawMessage {
                id: "m-1".into(),
                receipt: "r-1".into(),
                body: "{}".into(),
                attributes: Default::default(),
            }])
        })
    }

    #[tokio::test]
    async fn empty_chain_calls_terminal() {
        let chain = MiddlewareChain::new();
        let out = chain.run(&cx(), &one_message).await.unwrap();
        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn stages_wrap_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = MiddlewareChain::new()
            .with(Arc::new(Recording {
                label: "outer",
                log: log.clone(),
            }))
            .with(Arc::new(Recording {
                label: "inner",
                log: log.clone(),
            }));

        chain.run(&cx(), &one_message).await.unwrap();
        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec!["outer:before", "inner:before", "inner:after", "outer:after"]
        );
    }

    #[tokio::test]
    async fn stage_can_short_circuit() {
        let chain = MiddlewareChain::new().with(Arc::new(ShortCircuit));
        let terminal = || -> FetchFuture {
            Box::pin(async { panic!("terminal must not run") })
        };
        let out = chain.run(&cx(), &terminal).await.unwrap();
        assert!(out.is_empty());
    }
}
