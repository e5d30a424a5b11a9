//! # Queue-name keyed handler registry.
//!
//! Maps each subscribed queue name to the [`HandlerFactory`] that produces
//! handler instances for that queue's messages.
//!
//! ## Rules
//! - Mutated only during bus setup (`&mut self` methods); `Bus::run` freezes
//!   it behind an `Arc`, after which it is concurrently read by all dispatch
//!   workers — the build/run phase split is enforced by ownership, not locks.
//! - Keys are unique per queue name; re-registering replaces the previous
//!   factory (the bus logs a warning).
//! - Resolution happens once per message at dispatch time, by factory, so a
//!   handler can be fresh or scoped per delivery.

use std::collections::HashMap;

use crate::handlers::{Handler, HandlerFactory};

/// Read-mostly map from queue name to handler factory.
#[derive(Default)]
pub struct HandlerRegistry {
    factories: HashMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for `queue_name`, returning the factory it
    /// replaced, if any.
    pub fn insert(
        &mut self,
        queue_name: impl Into<String>,
        factory: HandlerFactory,
    ) -> Option<HandlerFactory> {
        self.factories.insert(queue_name.into(), factory)
    }

    /// Whether a handler is registered for `queue_name`.
    pub fn contains(&self, queue_name: &str) -> bool {
        self.factories.contains_key(queue_name)
    }

    /// Produces a handler instance for `queue_name` via its factory.
    ///
    /// Returns `None` only on internal inconsistency: setup validation
    /// guarantees every subscribed queue has a factory before run.
    pub fn resolve(&self, queue_name: &str) -> Option<std::sync::Arc<dyn Handler>> {
        self.factories.get(queue_name).map(|factory| factory())
    }

    /// Number of registered queue names.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the registry has no registrations.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::HandlerError;
    use crate::sources::MessageContext;

    struct CountingHandler;

    #[async_trait]
    impl Handler for CountingHandler {
        async fn handle(&self, _context: &MessageContext) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    fn counting_factory(calls: Arc<AtomicUsize>) -> HandlerFactory {
        Arc::new(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Arc::new(CountingHandler)
        })
    }

    #[test]
    fn resolve_invokes_factory_per_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();
        registry.insert("orders", counting_factory(calls.clone()));

        assert!(registry.resolve("orders").is_some());
        assert!(registry.resolve("orders").is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unknown_queue_resolves_none() {
        let registry = HandlerRegistry::new();
        assert!(registry.resolve("nowhere").is_none());
        assert!(!registry.contains("nowhere"));
    }

    #[test]
    fn reinsert_returns_previous_factory() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();
        assert!(registry
            .insert("orders", counting_factory(calls.clone()))
            .is_none());
        assert!(registry
            .insert("orders", counting_factory(calls))
            .is_some());
        assert_eq!(registry.len(), 1);
    }
}
