//! In-memory test doubles for the pipeline: a queue source with visibility
//! semantics and recording handlers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use quebus::{
    HandlerError, HandlerFactory, HandlerFn, QueueSource, RawMessage, SourceError,
    ATTR_APPROXIMATE_RECEIVE_COUNT,
};

static TRACING: Once = Once::new();

/// Routes runtime logs through the capture-aware test writer. Idempotent, so
/// every test calls it first.
pub fn init_test_logging() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

struct StoredMessage {
    id: String,
    body: String,
    receive_count: u32,
    visible_at: Instant,
    deleted: bool,
}

/// In-memory queue with receive-count and visibility-timeout semantics.
///
/// Fetching a message increments its receive count and hides it for the
/// configured visibility timeout; deleting removes it permanently; a
/// visibility change reschedules redelivery. This mirrors the at-least-once
/// contract the pipeline is built against.
pub struct TestQueueSource {
    name: String,
    uri: String,
    visibility: Duration,
    messages: Mutex<Vec<StoredMessage>>,
    fetch_calls: AtomicUsize,
    fatal: AtomicBool,
    next_id: AtomicUsize,
}

impl TestQueueSource {
    pub fn new(name: &str) -> Arc<Self> {
        Self::with_visibility(name, Duration::from_secs(30))
    }

    /// A queue whose fetched messages become visible again after `visibility`
    /// unless deleted or explicitly rescheduled.
    pub fn with_visibility(name: &str, visibility: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            uri: format!("test://{name}"),
            visibility,
            messages: Mutex::new(Vec::new()),
            fetch_calls: AtomicUsize::new(0),
            fatal: AtomicBool::new(false),
            next_id: AtomicUsize::new(0),
        })
    }

    /// A queue whose every fetch fails fatally.
    pub fn broken(name: &str) -> Arc<Self> {
        let source = Self::new(name);
        source.fatal.store(true, Ordering::SeqCst);
        source
    }

    /// Enqueues one visible message and returns its id.
    pub fn seed(&self, body: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let id = format!("{}-{n}", self.name);
        self.messages.lock().unwrap().push(StoredMessage {
            id: id.clone(),
            body: body.to_string(),
            receive_count: 0,
            visible_at: Instant::now(),
            deleted: false,
        });
        id
    }

    pub fn seed_many(&self, count: usize) {
        for i in 0..count {
            self.seed(&format!("payload-{i}"));
        }
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn deleted_count(&self) -> usize {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.deleted)
            .count()
    }

    pub fn is_deleted(&self, id: &str) -> bool {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.id == id && m.deleted)
    }

    pub fn receive_count(&self, id: &str) -> u32 {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.receive_count)
            .unwrap_or(0)
    }
}

#[async_trait]
impl QueueSource for TestQueueSource {
    fn queue_name(&self) -> &str {
        &self.name
    }

    fn region(&self) -> &str {
        "local"
    }

    fn uri(&self) -> &str {
        &self.uri
    }

    async fn fetch(
        &self,
        max_count: usize,
        wait_time: Duration,
        attribute_names: &[String],
        token: &CancellationToken,
    ) -> Result<Vec<RawMessage>, SourceError> {
        if self.fatal.load(Ordering::SeqCst) {
            return Err(SourceError::Fatal {
                reason: "broken test queue".into(),
            });
        }
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let want_count = attribute_names
            .iter()
            .any(|a| a == ATTR_APPROXIMATE_RECEIVE_COUNT);

        let batch: Vec<RawMessage> = {
            let now = Instant::now();
            let mut messages = self.messages.lock().unwrap();
            messages
                .iter_mut()
                .filter(|m| !m.deleted && m.visible_at <= now)
                .take(max_count)
                .map(|m| {
                    m.receive_count += 1;
                    m.visible_at = now + self.visibility;
                    let mut attributes = HashMap::new();
                    if want_count {
                        attributes.insert(
                            ATTR_APPROXIMATE_RECEIVE_COUNT.to_string(),
                            m.receive_count.to_string(),
                        );
                    }
                    RawMessage {
                        id: m.id.clone(),
                        receipt: m.id.clone(),
                        body: m.body.clone(),
                        attributes,
                    }
                })
                .collect()
        };

        if batch.is_empty() {
            // Long-poll briefly so an empty queue does not spin.
            let nap = wait_time.min(Duration::from_millis(10));
            tokio::select! {
                _ = token.cancelled() => return Err(SourceError::Cancelled),
                _ = tokio::time::sleep(nap) => {}
            }
        }
        Ok(batch)
    }

    async fn delete(&self, message: &RawMessage) -> Result<(), SourceError> {
        let mut messages = self.messages.lock().unwrap();
        if let Some(stored) = messages.iter_mut().find(|m| m.id == message.receipt) {
            stored.deleted = true;
        }
        Ok(())
    }

    async fn change_visibility(
        &self,
        message: &RawMessage,
        delay: Duration,
    ) -> Result<(), SourceError> {
        let mut messages = self.messages.lock().unwrap();
        if let Some(stored) = messages.iter_mut().find(|m| m.id == message.receipt) {
            stored.visible_at = Instant::now() + delay;
        }
        Ok(())
    }
}

/// Handler factory that records every handled body and always succeeds.
pub fn recording_handler(log: Arc<Mutex<Vec<String>>>) -> HandlerFactory {
    HandlerFn::factory(move |msg| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(msg.body.clone());
            Ok(())
        }
    })
}

/// Handler factory that fails while the message's approximate receive count
/// is below `succeed_at`, then succeeds and records the body.
pub fn flaky_handler(log: Arc<Mutex<Vec<String>>>, succeed_at: u32) -> HandlerFactory {
    HandlerFn::factory(move |msg| {
        let log = Arc::clone(&log);
        async move {
            let count = msg
                .attributes
                .get(ATTR_APPROXIMATE_RECEIVE_COUNT)
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(1);
            if count < succeed_at {
                return Err(HandlerError::new(format!(
                    "not yet, receive count {count}"
                )));
            }
            log.lock().unwrap().push(msg.body.clone());
            Ok(())
        }
    })
}

/// Handler factory that always fails.
pub fn failing_handler() -> HandlerFactory {
    HandlerFn::factory(|_msg| async move { Err(HandlerError::new("always fails")) })
}

/// Handler factory that sleeps for `delay` per message, then succeeds.
pub fn slow_handler(delay: Duration, handled: Arc<AtomicUsize>) -> HandlerFactory {
    HandlerFn::factory(move |_msg| {
        let handled = Arc::clone(&handled);
        async move {
            tokio::time::sleep(delay).await;
            handled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })
}
