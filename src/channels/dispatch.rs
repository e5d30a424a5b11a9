//! # DispatchWorker: pulls merged messages and runs the handling contract.
//!
//! One worker per unit of configured concurrency. Each worker processes
//! messages strictly sequentially; parallelism comes from running several
//! workers against the shared [`MergedReader`], never from overlapping work
//! within one worker.
//!
//! ## Per-message contract
//! ```text
//! pull next ──► resolve handler by queue name
//!           ──► invoke handler (panic-isolated)
//!           ──► Ok        → delete message at its source
//!               Err/panic → optional backoff: requeue with explicit delay
//!           ──► record outcome + timing (never skipped)
//!           ──► next message
//! ```
//!
//! ## Rules
//! - A single message's failure never terminates the worker loop.
//! - Handler panics are caught at the per-message boundary
//!   (`catch_unwind`) and treated as a failed outcome.
//! - Cancellation is checked **between** messages; in-flight handling always
//!   finishes, including its acknowledgement.
//! - A missing handler at dispatch time is an internal-consistency failure
//!   (setup validation makes it unreachable): logged at `error`, message left
//!   for redelivery, loop continues.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::channels::MergedReader;
use crate::error::BusError;
use crate::handlers::HandlerRegistry;
use crate::monitor::{HandleOutcome, Monitor};
use crate::policies::BackoffStrategy;
use crate::sources::MessageContext;

/// One concurrency slot draining the merged channel.
pub struct DispatchWorker {
    reader: MergedReader,
    registry: Arc<HandlerRegistry>,
    monitor: Arc<dyn Monitor>,
    backoff: Option<Arc<dyn BackoffStrategy>>,
}

impl DispatchWorker {
    /// Creates a worker over the merged channel.
    pub fn new(
        reader: MergedReader,
        registry: Arc<HandlerRegistry>,
        monitor: Arc<dyn Monitor>,
        backoff: Option<Arc<dyn BackoffStrategy>>,
    ) -> Self {
        Self {
            reader,
            registry,
            monitor,
            backoff,
        }
    }

    /// Runs the worker until the merged channel is closed and drained, or
    /// cancellation fires between messages.
    pub async fn run(self, token: CancellationToken) -> Result<(), BusError> {
        loop {
            let ctx = tokio::select! {
                _ = token.cancelled() => break,
                next = self.reader.recv() => match next {
                    Some(ctx) => ctx,
                    None => break,
                },
            };
            self.process(ctx).await;
        }
        Ok(())
    }

    /// Full handling contract for one message. Infallible by design: every
    /// failure mode is contained here.
    async fn process(&self, ctx: MessageContext) {
        let queue = ctx.queue_name().to_string();
        let started = Instant::now();

        let succeeded = self.invoke_handler(&ctx).await;

        if succeeded {
            self.acknowledge(&ctx).await;
        } else {
            self.schedule_redelivery(&ctx).await;
        }

        let outcome = if succeeded {
            HandleOutcome::Handled
        } else {
            HandleOutcome::Failed
        };
        self.monitor
            .message_handled(&queue, outcome, started.elapsed());
    }

    /// Resolves and invokes the handler, isolating errors and panics.
    async fn invoke_handler(&self, ctx: &MessageContext) -> bool {
        let Some(handler) = self.registry.resolve(ctx.queue_name()) else {
            // Setup validation guarantees a factory per subscribed queue; if
            // resolution fails anyway the message is left for redelivery.
            error!(
                queue = ctx.queue_name(),
                message_id = %ctx.message().id,
                "no handler resolved for dispatched message"
            );
            return false;
        };

        let invocation = AssertUnwindSafe(handler.handle(ctx)).catch_unwind().await;
        match invocation {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                info!(
                    queue = ctx.queue_name(),
                    message_id = %ctx.message().id,
                    error = %err,
                    "handler reported failure"
                );
                false
            }
            Err(panic) => {
                error!(
                    queue = ctx.queue_name(),
                    message_id = %ctx.message().id,
                    panic = panic_message(panic.as_ref()),
                    "handler panicked"
                );
                false
            }
        }
    }

    /// Deletes a successfully handled message from its source.
    async fn acknowledge(&self, ctx: &MessageContext) {
        if let Err(err) = ctx.delete().await {
            warn!(
                queue = ctx.queue_name(),
                message_id = %ctx.message().id,
                error = %err,
                "failed to delete handled message; it may be redelivered"
            );
        }
    }

    /// Applies the configured backoff via a visibility change; without a
    /// strategy the message is left to the queue's default redelivery.
    async fn schedule_redelivery(&self, ctx: &MessageContext) {
        let Some(strategy) = &self.backoff else {
            return;
        };
        let receive_count = ctx.approximate_receive_count().unwrap_or(1);
        let delay = strategy.delay(receive_count);
        if let Err(err) = ctx.requeue(delay).await {
            warn!(
                queue = ctx.queue_name(),
                message_id = %ctx.message().id,
                error = %err,
                "failed to requeue failed message with backoff delay"
            );
        }
    }
}

/// Best-effort extraction of a panic payload for logging.
fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
