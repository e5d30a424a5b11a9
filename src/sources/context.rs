//! # In-flight message context.
//!
//! [`MessageContext`] is the unit that travels through the pipeline channels:
//! one received message plus a handle to the [`QueueSource`] it came from, so
//! the dispatch stage can acknowledge or requeue it without knowing which
//! queue it was multiplexed out of.
//!
//! ## Ownership
//! A context is owned exclusively by the stage currently holding it; it is
//! moved (not cloned) through the channels, so at most one stage can act on a
//! given delivery. It is created by a receive buffer on successful fetch and
//! dropped after the dispatch worker completes acknowledgement or requeue.

use std::sync::Arc;
use std::time::Duration;

use crate::error::SourceError;
use crate::sources::{QueueSource, RawMessage};

/// One received message bound to its originating queue source.
pub struct MessageContext {
    message: RawMessage,
    source: Arc<dyn QueueSource>,
}

impl MessageContext {
    /// Binds a fetched message to the source that produced it.
    pub fn new(message: RawMessage, source: Arc<dyn QueueSource>) -> Self {
        Self { message, source }
    }

    /// Name of the originating queue; the handler-registry lookup key.
    pub fn queue_name(&self) -> &str {
        self.source.queue_name()
    }

    /// Region of the originating queue.
    pub fn region(&self) -> &str {
        self.source.region()
    }

    /// The raw message, including body and system attributes.
    pub fn message(&self) -> &RawMessage {
        &self.message
    }

    /// Opaque message body.
    pub fn body(&self) -> &str {
        &self.message.body
    }

    /// Approximate number of times this message has been received without
    /// being deleted, if the backend reported it.
    pub fn approximate_receive_count(&self) -> Option<u32> {
        self.message.approximate_receive_count()
    }

    /// Acknowledges the message, removing it from the remote queue.
    pub async fn delete(&self) -> Result<(), SourceError> {
        self.source.delete(&self.message).await
    }

    /// Requeues the message with an explicit redelivery delay.
    pub async fn requeue(&self, delay: Duration) -> Result<(), SourceError> {
        self.source.change_visibility(&self.message, delay).await
    }
}

impl std::fmt::Debug for MessageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageContext")
            .field("queue", &self.queue_name())
            .field("region", &self.region())
            .field("message_id", &self.message.id)
            .finish()
    }
}
