//! # EventBus - public facade of one bus instance.
//!
//! [`EventBus`] is a cheap, cloneable handle around the shared [`BusCore`]. All
//! clones talk to the same registry, sticky store and executors.
//!
//! ## Registration
//! ```text
//! register(&Arc<S>)
//!   ├─► discovery.find_handlers::<S>()      (IllegalSubscriber if none)
//!   ├─► registry.register(subscriber, descriptors, priority)
//!   └─► sticky? ─► for each new subscription, for each stored sticky event
//!                  that is-a the declared type ─► router.route (normal delivery path)
//! ```
//!
//! ## Posting
//! See `core/posting.rs` for the per-thread drain and `core/router.rs` for delivery.

use std::any::{TypeId, type_name};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use super::builder::BusBuilder;
use super::config::BusConfig;
use super::registry::SubscriptionRegistry;
use super::router::Router;
use super::sticky::StickyStore;
use crate::error::BusError;
use crate::events::{AnyEvent, Event, EventType, EventTypeResolver};
use crate::policies::FaultPolicy;
use crate::subscribers::{HandlerDiscovery, Subscriber, SubscriberId, SubscriberRef, Subscription};

static NEXT_BUS_ID: AtomicU64 = AtomicU64::new(1);

/// Shared state of one bus.
pub(crate) struct BusCore {
    pub(crate) id: u64,
    pub(crate) cfg: BusConfig,
    pub(crate) registry: SubscriptionRegistry,
    pub(crate) sticky: StickyStore,
    pub(crate) resolver: EventTypeResolver,
    pub(crate) discovery: HandlerDiscovery,
    pub(crate) router: Router,
    pub(crate) faults: FaultPolicy,
}

impl BusCore {
    pub(crate) fn new(cfg: BusConfig, router: Router, faults: FaultPolicy) -> Self {
        Self {
            id: NEXT_BUS_ID.fetch_add(1, Ordering::Relaxed),
            registry: SubscriptionRegistry::new(),
            sticky: StickyStore::new(),
            resolver: EventTypeResolver::new(cfg.event_inheritance),
            discovery: HandlerDiscovery::new(),
            router,
            faults,
            cfg,
        }
    }

    /// Delivers stored sticky events to freshly added subscriptions.
    fn replay_sticky(self: &Arc<Self>, added: &[Arc<Subscription>]) -> Result<(), BusError> {
        let stored = self.sticky.snapshot();
        if stored.is_empty() {
            return Ok(());
        }
        let on_affinity = self.router.is_affinity();
        for sub in added {
            let declared = sub.event_type();
            for event in &stored {
                if self.resolver.is_a(event.event_type(), declared) {
                    self.router.route(self, sub, event, on_affinity)?;
                }
            }
        }
        Ok(())
    }
}

/// In-process publish/subscribe event bus.
///
/// Cloning is cheap and yields a handle to the same bus.
#[derive(Clone)]
pub struct EventBus {
    core: Arc<BusCore>,
}

impl EventBus {
    /// Starts building a bus with `cfg`.
    pub fn builder(cfg: BusConfig) -> BusBuilder {
        BusBuilder::new(cfg)
    }

    /// Builds a bus with the default configuration and built-in executors.
    pub fn new() -> Result<Self, BusError> {
        BusBuilder::new(BusConfig::default()).build()
    }

    pub(crate) fn from_core(core: BusCore) -> Self {
        Self {
            core: Arc::new(core),
        }
    }

    /// Configuration the bus was built with.
    pub fn config(&self) -> &BusConfig {
        &self.core.cfg
    }

    /// Returns `true` if both handles refer to the same bus.
    pub fn ptr_eq(a: &EventBus, b: &EventBus) -> bool {
        Arc::ptr_eq(&a.core, &b.core)
    }

    /// Registers every handler of `subscriber`.
    ///
    /// # Errors
    /// - [`BusError::IllegalSubscriber`] if `S` declares no handlers.
    /// - [`BusError::DuplicateSubscription`] if `subscriber` is already registered;
    ///   nothing is changed in that case.
    pub fn register<S: Subscriber>(&self, subscriber: &Arc<S>) -> Result<(), BusError> {
        self.subscribe(subscriber, None, false)
    }

    /// Registers every handler of `subscriber` with `priority`, overriding the
    /// priorities declared in its handler table.
    pub fn register_with_priority<S: Subscriber>(
        &self,
        subscriber: &Arc<S>,
        priority: i32,
    ) -> Result<(), BusError> {
        self.subscribe(subscriber, Some(priority), false)
    }

    /// Registers `subscriber` and replays matching sticky events to it.
    ///
    /// Replay goes through the normal thread-mode routing. With `rethrow_on_fault`
    /// a fault during an inline replay is returned; the registration stays in place.
    pub fn register_sticky<S: Subscriber>(&self, subscriber: &Arc<S>) -> Result<(), BusError> {
        self.subscribe(subscriber, None, true)
    }

    /// [`register_sticky`](Self::register_sticky) with a priority override.
    pub fn register_sticky_with_priority<S: Subscriber>(
        &self,
        subscriber: &Arc<S>,
        priority: i32,
    ) -> Result<(), BusError> {
        self.subscribe(subscriber, Some(priority), true)
    }

    fn subscribe<S: Subscriber>(
        &self,
        subscriber: &Arc<S>,
        priority: Option<i32>,
        sticky: bool,
    ) -> Result<(), BusError> {
        let descriptors = self.core.discovery.find_handlers::<S>()?;
        let added =
            self.core
                .registry
                .register(SubscriberRef::new(subscriber), &descriptors, priority)?;
        debug!(
            subscriber = type_name::<S>(),
            handlers = added.len(),
            sticky,
            "subscriber registered"
        );
        if sticky {
            self.core.replay_sticky(&added)?;
        }
        Ok(())
    }

    /// Removes every subscription of `subscriber`.
    ///
    /// Deliveries already queued for it are dropped. Unregistering an unknown
    /// subscriber only logs a warning; returns whether it was registered.
    pub fn unregister<S: Subscriber>(&self, subscriber: &Arc<S>) -> bool {
        let removed = self.core.registry.unregister(SubscriberId::of(subscriber));
        if removed {
            debug!(subscriber = type_name::<S>(), "subscriber unregistered");
        } else {
            warn!(
                subscriber = type_name::<S>(),
                "subscriber to unregister was not registered before"
            );
        }
        removed
    }

    /// Returns `true` while `subscriber` has subscriptions on this bus.
    pub fn is_registered<S: ?Sized>(&self, subscriber: &Arc<S>) -> bool {
        self.core.registry.is_registered(SubscriberId::of(subscriber))
    }

    /// Posts `event` to its subscribers and to those of its ancestor and capability types.
    ///
    /// Direct deliveries run before this returns, unless the calling thread is
    /// already delivering for this bus: then the event is queued and delivered after
    /// the current one.
    ///
    /// # Errors
    /// [`BusError::HandlerInvocation`] when a handler fails with `rethrow_on_fault`.
    pub fn post<E: Event>(&self, event: E) -> Result<(), BusError> {
        self.core.post_erased(Arc::new(event))
    }

    /// Posts an already shared event.
    pub fn post_shared(&self, event: Arc<dyn AnyEvent>) -> Result<(), BusError> {
        self.core.post_erased(event)
    }

    /// Stores `event` as the sticky event of its type, then posts it.
    ///
    /// The store is updated before any handler runs.
    pub fn post_sticky<E: Event>(&self, event: E) -> Result<(), BusError> {
        let event: Arc<dyn AnyEvent> = Arc::new(event);
        self.core.sticky.put(Arc::clone(&event));
        self.core.post_erased(event)
    }

    /// Stops delivery of `event` to the remaining subscribers of the type being delivered.
    ///
    /// Pass the reference the handler received. Subscribers of the other types the
    /// event resolves to still receive it.
    ///
    /// # Errors
    /// [`BusError::InvalidCancellation`] unless called from a Direct handler, on the
    /// posting thread, for the event it is currently handling.
    pub fn cancel_delivery<T: ?Sized>(&self, event: &T) -> Result<(), BusError> {
        self.core.cancel(std::ptr::from_ref(event).cast::<()>())
    }

    /// Most recent sticky event of type `E`.
    pub fn get_sticky<E: Event>(&self) -> Option<Arc<E>> {
        self.core
            .sticky
            .get(TypeId::of::<E>())
            .and_then(|event| event.into_any_arc().downcast::<E>().ok())
    }

    /// Removes and returns the sticky event of type `E`.
    pub fn remove_sticky<E: Event>(&self) -> Option<Arc<E>> {
        self.core
            .sticky
            .remove(TypeId::of::<E>())
            .and_then(|event| event.into_any_arc().downcast::<E>().ok())
    }

    /// Removes the sticky event of type `E` if it equals `event`.
    pub fn remove_sticky_if_equal<E: Event + PartialEq>(&self, event: &E) -> bool {
        self.core.sticky.remove_if(TypeId::of::<E>(), |stored| {
            stored.downcast_ref::<E>().is_some_and(|stored| stored == event)
        })
    }

    /// Removes every sticky event.
    pub fn remove_all_sticky(&self) {
        self.core.sticky.clear();
    }

    /// Returns `true` if posting an `E` would reach at least one subscriber.
    pub fn has_subscriber_for<E: Event>(&self) -> bool {
        self.has_subscriber_for_type(EventType::of::<E>())
    }

    /// [`has_subscriber_for`](Self::has_subscriber_for) for a runtime event type.
    pub fn has_subscriber_for_type(&self, ty: EventType) -> bool {
        self.core
            .resolver
            .resolve(ty)
            .iter()
            .any(|t| self.core.registry.has_subscribers(t.id()))
    }

    /// Drops the cached type closures and handler tables.
    pub fn clear_caches(&self) {
        self.core.resolver.clear();
        self.core.discovery.clear();
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("id", &self.core.id)
            .field("event_inheritance", &self.core.cfg.event_inheritance)
            .finish_non_exhaustive()
    }
}
