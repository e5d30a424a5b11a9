//! Error types used by the quebus runtime, queue sources, and handlers.
//!
//! This module defines three error enums:
//!
//! - [`BusError`] — errors raised by the bus runtime itself (setup validation,
//!   component failures surfaced after a group finishes unwinding).
//! - [`SourceError`] — errors raised at the queue-source boundary (fetch,
//!   delete, visibility change).
//! - [`HandlerError`] — failures reported by application message handlers.
//!
//! All types provide an `as_label` helper producing a short stable label for
//! logs/metrics, and [`SourceError`] distinguishes transient conditions (which
//! keep a receive loop alive) from fatal ones (which terminate one buffer).

use thiserror::Error;

/// # Errors produced by the bus runtime.
///
/// Setup errors ([`BusError::NoHandlerRegistered`], [`BusError::NoQueues`])
/// are raised before any component starts running. Component errors are
/// surfaced via `run()` only after every constituent of the failing group has
/// settled.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BusError {
    /// A queue was subscribed with `add_queue` but no handler was registered
    /// for it before `run`.
    #[error("no handler registered for queue '{queue}'")]
    NoHandlerRegistered {
        /// Name of the queue missing a handler.
        queue: String,
    },

    /// `run` was invoked on a bus with no subscribed queues.
    #[error("bus started with no subscribed queues")]
    NoQueues,

    /// A receive buffer terminated with a fatal source error.
    #[error("receive buffer for queue '{queue}' failed: {source}")]
    ReceiveBufferFailed {
        /// Queue whose buffer failed.
        queue: String,
        /// Underlying source error.
        #[source]
        source: SourceError,
    },

    /// A pipeline component panicked or was aborted while joining.
    #[error("component task join failed: {reason}")]
    Join {
        /// Description of the join failure.
        reason: String,
    },
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::NoHandlerRegistered { .. } => "bus_no_handler_registered",
            BusError::NoQueues => "bus_no_queues",
            BusError::ReceiveBufferFailed { .. } => "bus_receive_buffer_failed",
            BusError::Join { .. } => "bus_join_failed",
        }
    }
}

/// # Errors produced at the queue-source boundary.
///
/// A [`QueueSource`](crate::sources::QueueSource) returns these from fetch,
/// delete and visibility operations. `Transient` keeps the receive loop
/// polling; `Fatal` terminates the owning buffer (and only that buffer);
/// `Cancelled` is a cooperative exit, not a failure.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SourceError {
    /// Recoverable condition (throttling, transient network failure).
    /// The receive loop logs and continues.
    #[error("transient source error: {reason}")]
    Transient {
        /// The underlying error message.
        reason: String,
    },

    /// Unrecoverable condition. Terminates the owning receive buffer.
    #[error("fatal source error: {reason}")]
    Fatal {
        /// The underlying error message.
        reason: String,
    },

    /// The operation observed cancellation. Cooperative exit path.
    #[error("source operation cancelled")]
    Cancelled,
}

impl SourceError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SourceError::Transient { .. } => "source_transient",
            SourceError::Fatal { .. } => "source_fatal",
            SourceError::Cancelled => "source_cancelled",
        }
    }

    /// Indicates whether the receive loop may keep polling after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Transient { .. })
    }
}

/// # Failure reported by an application message handler.
///
/// A handler that returns `Err(HandlerError)` leaves the message on the remote
/// queue for redelivery; it never terminates the dispatch worker.
#[derive(Error, Debug)]
#[error("handler failed: {reason}")]
pub struct HandlerError {
    /// Human-readable failure description.
    pub reason: String,
}

impl HandlerError {
    /// Creates a handler error from any displayable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        let err = BusError::NoHandlerRegistered {
            queue: "orders".into(),
        };
        assert_eq!(err.as_label(), "bus_no_handler_registered");
        assert_eq!(SourceError::Cancelled.as_label(), "source_cancelled");
    }

    #[test]
    fn transient_is_retryable_fatal_is_not() {
        assert!(SourceError::Transient {
            reason: "throttled".into()
        }
        .is_transient());
        assert!(!SourceError::Fatal {
            reason: "queue deleted".into()
        }
        .is_transient());
        assert!(!SourceError::Cancelled.is_transient());
    }

    #[test]
    fn no_handler_message_names_queue() {
        let err = BusError::NoHandlerRegistered {
            queue: "payments".into(),
        };
        assert_eq!(
            err.to_string(),
            "no handler registered for queue 'payments'"
        );
    }
}
