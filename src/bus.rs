//! # Bus: setup-time registration and the run entry point.
//!
//! A [`Bus`] is configured in two phases:
//!
//! 1. **Setup** — subscribe queues into named groups with
//!    [`add_queue`](Bus::add_queue), register handlers with
//!    [`add_message_handler`](Bus::add_message_handler), and optionally set
//!    group overrides, middleware, monitor, and backoff strategy. All of this
//!    takes `&mut self`.
//! 2. **Run** — [`run`](Bus::run) consumes the bus, validates that every
//!    subscribed queue has a handler (fail fast, before any message is
//!    fetched), builds the subscription groups, and drives the collection to
//!    completion.
//!
//! The consuming `run` is what enforces the two-phase lifecycle: after start
//! there is no `&mut Bus` left anywhere, so the handler registry and group
//! layout are immutable and freely shared without locks.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use quebus::{Bus, HandlerError, HandlerFn};
//! # fn sqs_source(_name: &str) -> Arc<dyn quebus::QueueSource> { unimplemented!() }
//!
//! # async fn example() -> Result<(), quebus::BusError> {
//! let mut bus = Bus::new();
//! bus.add_queue("eu-west-1", "default", sqs_source("orders"));
//! bus.add_message_handler("orders", HandlerFn::factory(|msg| async move {
//!     println!("order: {}", msg.body);
//!     Ok::<(), HandlerError>(())
//! }));
//!
//! bus.run(CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::channels::{
    DispatchWorker, Multiplexer, ReceiveBuffer, SubscriptionGroup, SubscriptionGroupCollection,
};
use crate::config::GroupSettings;
use crate::error::BusError;
use crate::handlers::{HandlerFactory, HandlerRegistry};
use crate::interrogate::{BufferStatus, BusStatus, GroupStatus, MultiplexerStatus};
use crate::middleware::MiddlewareChain;
use crate::monitor::{Monitor, NoopMonitor};
use crate::policies::BackoffStrategy;
use crate::shutdown;
use crate::sources::QueueSource;

/// Client-side message bus: subscribed queues, handlers, and the pipeline
/// configuration needed to run them.
pub struct Bus {
    default_settings: GroupSettings,
    group_settings: HashMap<String, GroupSettings>,
    /// Group name → subscribed sources, in registration order.
    groups: Vec<(String, Vec<Arc<dyn QueueSource>>)>,
    handlers: HandlerRegistry,
    middleware: MiddlewareChain,
    monitor: Arc<dyn Monitor>,
    backoff: Option<Arc<dyn BackoffStrategy>>,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    /// Creates a bus with default group settings, a no-op monitor, an empty
    /// middleware chain, and no backoff strategy.
    pub fn new() -> Self {
        Self {
            default_settings: GroupSettings::default(),
            group_settings: HashMap::new(),
            groups: Vec::new(),
            handlers: HandlerRegistry::new(),
            middleware: MiddlewareChain::new(),
            monitor: Arc::new(NoopMonitor),
            backoff: None,
        }
    }

    /// Replaces the default settings applied to groups without an override.
    pub fn set_default_settings(&mut self, settings: GroupSettings) {
        self.default_settings = settings;
    }

    /// Overrides settings for one named group.
    pub fn with_group_settings(&mut self, group: impl Into<String>, settings: GroupSettings) {
        self.group_settings.insert(group.into(), settings);
    }

    /// Sets the monitoring collaborator shared by all buffers and workers.
    pub fn set_monitor(&mut self, monitor: Arc<dyn Monitor>) {
        self.monitor = monitor;
    }

    /// Sets the middleware chain applied around every fetch call.
    pub fn set_middleware(&mut self, middleware: MiddlewareChain) {
        self.middleware = middleware;
    }

    /// Sets the backoff strategy consulted for failed messages. Buffers also
    /// start requesting the approximate-receive-count attribute once a
    /// strategy is configured.
    pub fn set_backoff(&mut self, strategy: Arc<dyn BackoffStrategy>) {
        self.backoff = Some(strategy);
    }

    /// Subscribes a queue source into `group`. Must be called before `run`.
    ///
    /// `region` is informational (the source itself carries its locator); it
    /// is logged to make multi-region setups traceable.
    pub fn add_queue(&mut self, region: &str, group: &str, source: Arc<dyn QueueSource>) {
        info!(
            queue = source.queue_name(),
            region,
            group,
            "subscribed queue"
        );
        match self.groups.iter_mut().find(|(name, _)| name == group) {
            Some((_, sources)) => sources.push(source),
            None => self.groups.push((group.to_string(), vec![source])),
        }
    }

    /// Registers the handler factory for `queue_name`. Must be called before
    /// `run`; re-registering replaces the previous factory.
    pub fn add_message_handler(&mut self, queue_name: &str, factory: HandlerFactory) {
        if self.handlers.insert(queue_name, factory).is_some() {
            warn!(queue = queue_name, "replaced existing handler registration");
        } else {
            info!(queue = queue_name, "registered handler");
        }
    }

    /// Static-config snapshot of the bus as currently configured.
    pub fn interrogate(&self) -> BusStatus {
        let backoff_name = self.backoff.as_ref().map(|s| s.name().to_string());
        let groups = self
            .groups
            .iter()
            .map(|(name, sources)| {
                let settings = self.settings_for(name);
                GroupStatus {
                    name: name.clone(),
                    concurrency_limit: settings.concurrency_limit,
                    multiplexer: MultiplexerStatus {
                        capacity: settings.multiplexer_capacity,
                        source_count: sources.len(),
                    },
                    receive_buffers: sources
                        .iter()
                        .map(|source| BufferStatus {
                            queue_name: source.queue_name().to_string(),
                            region: source.region().to_string(),
                            prefetch: settings.prefetch,
                            buffer_size: settings.buffer_size,
                            backoff_strategy: backoff_name.clone(),
                        })
                        .collect(),
                }
            })
            .collect();
        BusStatus { groups }
    }

    /// Validates the configuration and runs the bus until `token` is
    /// cancelled (followed by graceful drain) or until all groups complete.
    ///
    /// Fails fast — before any message is fetched — if a subscribed queue has
    /// no registered handler, or if no queues were subscribed at all.
    pub async fn run(self, token: CancellationToken) -> Result<(), BusError> {
        let collection = self.build()?;
        collection.run(token).await
    }

    /// Like [`run`](Bus::run), but wires OS termination signals
    /// (SIGINT/SIGTERM/SIGQUIT, Ctrl-C) to the cancellation token.
    pub async fn run_until_shutdown(self) -> Result<(), BusError> {
        let token = CancellationToken::new();
        let signal_token = token.clone();
        tokio::spawn(async move {
            if shutdown::wait_for_shutdown_signal().await.is_ok() {
                info!("shutdown signal received, cancelling bus");
                signal_token.cancel();
            }
        });
        self.run(token).await
    }

    /// Validates and assembles the subscription group collection.
    fn build(self) -> Result<SubscriptionGroupCollection, BusError> {
        if self.groups.is_empty() {
            return Err(BusError::NoQueues);
        }
        for (_, sources) in &self.groups {
            for source in sources {
                if !self.handlers.contains(source.queue_name()) {
                    return Err(BusError::NoHandlerRegistered {
                        queue: source.queue_name().to_string(),
                    });
                }
            }
        }

        let Bus {
            default_settings,
            group_settings,
            groups,
            handlers,
            middleware,
            monitor,
            backoff,
        } = self;

        let registry = Arc::new(handlers);
        let mut built = Vec::with_capacity(groups.len());

        for (name, sources) in groups {
            let settings = group_settings
                .get(&name)
                .cloned()
                .unwrap_or_else(|| default_settings.clone())
                .normalized();

            let mut multiplexer = Multiplexer::new(settings.multiplexer_capacity);
            let mut buffers = Vec::with_capacity(sources.len());

            for source in sources {
                let (buffer, output) = ReceiveBuffer::new(
                    &settings,
                    source,
                    middleware.clone(),
                    Arc::clone(&monitor),
                    backoff.as_ref(),
                );
                multiplexer.register(output);
                buffers.push(buffer);
            }

            let workers = (0..settings.concurrency_limit)
                .map(|_| {
                    DispatchWorker::new(
                        multiplexer.reader(),
                        Arc::clone(&registry),
                        Arc::clone(&monitor),
                        backoff.clone(),
                    )
                })
                .collect();

            built.push(SubscriptionGroup::new(name, buffers, multiplexer, workers));
        }

        Ok(SubscriptionGroupCollection::new(built))
    }

    /// Effective settings for `group`: the override (or the defaults),
    /// normalized the same way `build` normalizes them, so interrogation
    /// matches what actually runs.
    fn settings_for(&self, group: &str) -> GroupSettings {
        self.group_settings
            .get(group)
            .cloned()
            .unwrap_or_else(|| self.default_settings.clone())
            .normalized()
    }
}
