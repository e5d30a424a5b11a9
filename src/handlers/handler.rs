//! # Handler trait and function-backed handler.
//!
//! A [`Handler`] processes one dispatched message. Returning `Ok(())` means
//! the message is acknowledged (deleted at its source); returning
//! `Err(HandlerError)` — or panicking — leaves it on the remote queue for
//! redelivery.
//!
//! [`HandlerFn`] wraps a closure `F: Fn(RawMessage) -> Fut`, producing a
//! fresh future per message. This avoids shared mutable state; if shared
//! state is needed, move an `Arc<...>` into the closure explicitly.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::sources::{MessageContext, RawMessage};

/// Zero-argument factory producing a handler instance per message.
///
/// Registered per queue name before the bus starts; invoked by dispatch
/// workers to get a fresh (or scoped) instance for each delivery.
pub type HandlerFactory = Arc<dyn Fn() -> Arc<dyn Handler> + Send + Sync>;

/// # Processes one message.
///
/// Implementations must be `Send + Sync`: several dispatch workers may be
/// handling messages from the same queue concurrently, each with its own
/// factory-produced instance.
///
/// The handler observes the message through its [`MessageContext`] but never
/// acknowledges it — delete/requeue is the dispatch worker's job, driven by
/// this method's result.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use quebus::{Handler, HandlerError, MessageContext};
///
/// struct OrderHandler;
///
/// #[async_trait]
/// impl Handler for OrderHandler {
///     async fn handle(&self, ctx: &MessageContext) -> Result<(), HandlerError> {
///         if ctx.body().is_empty() {
///             return Err(HandlerError::new("empty order"));
///         }
///         // process the order...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handles a single message.
    ///
    /// `Ok(())` acknowledges the message; `Err` leaves it for redelivery.
    async fn handle(&self, context: &MessageContext) -> Result<(), HandlerError>;
}

/// Function-backed handler.
///
/// Wraps a closure that creates a new future per message. The closure
/// receives an owned copy of the raw message; the queue is implicit in where
/// the handler was registered.
pub struct HandlerFn<F> {
    f: F,
}

impl<F, Fut> HandlerFn<F>
where
    F: Fn(RawMessage) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    /// Creates a new function-backed handler.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }

    /// Wraps the handler in a factory that hands out the same shared
    /// instance for every message.
    ///
    /// ## Example
    /// ```rust
    /// use quebus::{HandlerError, HandlerFn};
    ///
    /// let factory = HandlerFn::factory(|msg| async move {
    ///     if msg.body.is_empty() {
    ///         return Err(HandlerError::new("empty body"));
    ///     }
    ///     Ok(())
    /// });
    /// let _handler = factory();
    /// ```
    pub fn factory(f: F) -> HandlerFactory {
        let shared: Arc<dyn Handler> = Self::arc(f);
        Arc::new(move || Arc::clone(&shared))
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(RawMessage) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, context: &MessageContext) -> Result<(), HandlerError> {
        (self.f)(context.message().clone()).await
    }
}
