//! # SubscriptionGroupCollection: all groups of one bus.
//!
//! The top-level runnable the public "start listening" operation drives.
//! Applies the same join-then-report policy as
//! [`SubscriptionGroup`](crate::channels::SubscriptionGroup), one level up:
//! every group runs to completion (or drains after cancellation) before the
//! first group failure is surfaced.

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::channels::group::{join_all_settle, SubscriptionGroup};
use crate::error::BusError;
use crate::interrogate::BusStatus;

/// Owns and runs every subscription group of a bus instance.
pub struct SubscriptionGroupCollection {
    groups: Vec<SubscriptionGroup>,
}

impl SubscriptionGroupCollection {
    /// Creates a collection over the given groups.
    pub fn new(groups: Vec<SubscriptionGroup>) -> Self {
        Self { groups }
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the collection has no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Snapshot of every group's configuration.
    pub fn interrogate(&self) -> BusStatus {
        BusStatus {
            groups: self.groups.iter().map(|g| g.interrogate()).collect(),
        }
    }

    /// Starts all groups concurrently; completes when all groups complete.
    ///
    /// One group's failure does not interrupt the others: the first failure
    /// is reported only after every group has settled.
    pub async fn run(self, token: CancellationToken) -> Result<(), BusError> {
        info!(groups = self.groups.len(), "starting subscription groups");

        let mut set: JoinSet<Result<(), BusError>> = JoinSet::new();
        for group in self.groups {
            set.spawn(group.run(token.child_token()));
        }
        join_all_settle(&mut set).await
    }
}
