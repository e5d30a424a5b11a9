//! # SubscriptionGroup: one cancelable unit of buffers, multiplexer, workers.
//!
//! Coordinates reading from a set of [`ReceiveBuffer`]s and dispatching via a
//! pool of [`DispatchWorker`]s, joined through one [`Multiplexer`].
//!
//! ## Why all three layers start concurrently
//! Each layer blocks on channel readiness: a buffer blocks on output-channel
//! capacity that only drains once the multiplexer runs, which in turn only
//! drains once workers run. Sequential start would deadlock, so `run` spawns
//! everything into one `JoinSet` and joins on all of it.
//!
//! ## Failure policy
//! A fatal error in one receive buffer terminates that buffer only; sibling
//! buffers, the multiplexer, and the workers keep running. The first failure
//! from any constituent is surfaced from `run` only after **all** constituent
//! tasks have settled, so a crash never silently orphans the others mid-run.

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::channels::{DispatchWorker, Multiplexer, ReceiveBuffer};
use crate::error::BusError;
use crate::interrogate::GroupStatus;

/// A set of receive buffers, one multiplexer, and a dispatch worker pool,
/// run and cancelled as one unit.
pub struct SubscriptionGroup {
    name: String,
    buffers: Vec<ReceiveBuffer>,
    multiplexer: Multiplexer,
    workers: Vec<DispatchWorker>,
}

impl SubscriptionGroup {
    /// Assembles a group. The buffers' output channels must already be
    /// registered with `multiplexer`, and the workers must read from its
    /// merged output (the bus build step wires this).
    pub fn new(
        name: impl Into<String>,
        buffers: Vec<ReceiveBuffer>,
        multiplexer: Multiplexer,
        workers: Vec<DispatchWorker>,
    ) -> Self {
        Self {
            name: name.into(),
            buffers,
            multiplexer,
            workers,
        }
    }

    /// Group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Aggregated static-config snapshot: group name, concurrency, the
    /// multiplexer's status, and each buffer's status.
    pub fn interrogate(&self) -> GroupStatus {
        GroupStatus {
            name: self.name.clone(),
            concurrency_limit: self.workers.len(),
            multiplexer: self.multiplexer.interrogate(),
            receive_buffers: self.buffers.iter().map(|b| b.interrogate()).collect(),
        }
    }

    /// Runs every buffer, the multiplexer, and every worker concurrently;
    /// completes when all of them have completed.
    ///
    /// Returns the first constituent failure, reported only after the whole
    /// group has settled.
    pub async fn run(self, token: CancellationToken) -> Result<(), BusError> {
        info!(
            group = self.name,
            buffers = self.buffers.len(),
            workers = self.workers.len(),
            "starting subscription group"
        );

        let mut set: JoinSet<Result<(), BusError>> = JoinSet::new();
        for buffer in self.buffers {
            set.spawn(buffer.run(token.child_token()));
        }
        set.spawn(self.multiplexer.run(token.child_token()));
        for worker in self.workers {
            set.spawn(worker.run(token.child_token()));
        }

        let result = join_all_settle(&mut set).await;
        info!(group = self.name, "subscription group completed");
        result
    }
}

/// Joins every task in the set, returning the first error observed — but
/// only after all tasks have settled.
pub(crate) async fn join_all_settle(
    set: &mut JoinSet<Result<(), BusError>>,
) -> Result<(), BusError> {
    let mut first_err = None;
    while let Some(joined) = set.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(err) => Err(BusError::Join {
                reason: err.to_string(),
            }),
        };
        if let Err(err) = outcome {
            if first_err.is_none() {
                first_err = Some(err);
            }
        }
    }
    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
