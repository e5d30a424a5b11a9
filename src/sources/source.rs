//! # Queue source abstraction and raw message type.
//!
//! [`QueueSource`] is the seam between the pipeline and the wire-level
//! transport. The runtime never talks to a messaging backend directly; it
//! fetches, deletes, and requeues exclusively through this trait, which keeps
//! the receive/dispatch machinery testable with in-memory doubles.
//!
//! A source represents **one** remote queue. Identity accessors
//! ([`queue_name`](QueueSource::queue_name), [`region`](QueueSource::region),
//! [`uri`](QueueSource::uri)) are stable for the lifetime of the source.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::SourceError;

/// Message-system attribute carrying the approximate number of times a
/// message has been received without being deleted. Requested by receive
/// buffers that have a backoff strategy configured.
pub const ATTR_APPROXIMATE_RECEIVE_COUNT: &str = "ApproximateReceiveCount";

/// One message as fetched from a remote queue.
///
/// The body is opaque to the runtime; interpretation belongs to the
/// application handler. System attributes are carried as an opaque string map
/// keyed by attribute name.
#[derive(Clone, Debug)]
pub struct RawMessage {
    /// Backend-assigned message id.
    pub id: String,
    /// Receipt handle identifying this *delivery* of the message, required
    /// for delete and visibility operations.
    pub receipt: String,
    /// Opaque message body.
    pub body: String,
    /// Message-system attributes returned with the fetch.
    pub attributes: HashMap<String, String>,
}

impl RawMessage {
    /// Reads the approximate receive count attribute, if present and numeric.
    pub fn approximate_receive_count(&self) -> Option<u32> {
        self.attributes
            .get(ATTR_APPROXIMATE_RECEIVE_COUNT)
            .and_then(|v| v.parse().ok())
    }
}

/// # One remote queue, as seen by the pipeline.
///
/// Implementations wrap a transport client for a single queue. All operations
/// must be safe to call concurrently; the dispatch workers share one source
/// per queue.
///
/// ## Cancellation
/// [`fetch`](QueueSource::fetch) receives the caller's [`CancellationToken`]
/// and should return [`SourceError::Cancelled`] promptly once it fires.
/// Delete and visibility calls are short and are allowed to complete after
/// cancellation (an in-flight message finishes its acknowledgement).
#[async_trait]
pub trait QueueSource: Send + Sync + 'static {
    /// Stable queue name; also the handler-registry key.
    fn queue_name(&self) -> &str;

    /// Region or locator of the hosting backend.
    fn region(&self) -> &str;

    /// Full URI of the remote queue, for diagnostics.
    fn uri(&self) -> &str;

    /// Fetches up to `max_count` messages, long-polling up to `wait_time`.
    ///
    /// `attribute_names` selects which message-system attributes the backend
    /// should return; the set is fixed at buffer construction time.
    /// An empty result is normal (no backlog), not an error.
    async fn fetch(
        &self,
        max_count: usize,
        wait_time: Duration,
        attribute_names: &[String],
        token: &CancellationToken,
    ) -> Result<Vec<RawMessage>, SourceError>;

    /// Deletes one delivered message, removing it from the remote queue.
    async fn delete(&self, message: &RawMessage) -> Result<(), SourceError>;

    /// Makes the message invisible for `delay`, scheduling redelivery after
    /// an explicit backoff rather than the queue's default timeout.
    async fn change_visibility(
        &self,
        message: &RawMessage,
        delay: Duration,
    ) -> Result<(), SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receive_count_parses_numeric_attribute() {
        let mut attributes = HashMap::new();
        attributes.insert(ATTR_APPROXIMATE_RECEIVE_COUNT.to_string(), "3".to_string());
        let msg = RawMessage {
            id: "m-1".into(),
            receipt: "r-1".into(),
            body: String::new(),
            attributes,
        };
        assert_eq!(msg.approximate_receive_count(), Some(3));
    }

    #[test]
    fn receive_count_absent_or_garbage_is_none() {
        let mut msg = RawMessage {
            id: "m-1".into(),
            receipt: "r-1".into(),
            body: String::new(),
            attributes: HashMap::new(),
        };
        assert_eq!(msg.approximate_receive_count(), None);

        msg.attributes.insert(
            ATTR_APPROXIMATE_RECEIVE_COUNT.to_string(),
            "many".to_string(),
        );
        assert_eq!(msg.approximate_receive_count(), None);
    }
}
