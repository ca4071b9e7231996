//! # Subscriber trait.
//!
//! Provides [`Subscriber`], the extension point through which a component tells the
//! bus which events it handles. Discovery is explicit: the subscriber fills a
//! [`HandlerTable`] instead of the bus scanning it for handler methods.
//!
//! ## Rules
//! - A subscriber is identified by its `Arc` allocation: registering two different
//!   `Arc`s of the same type yields two independent subscribers.
//! - A subscriber that declares no handlers cannot be registered.
//! - Handlers are synchronous; a slow handler stalls the context it runs on.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use postbus::{BusConfig, Event, EventBus, HandlerTable, Subscriber, ThreadMode};
//!
//! #[derive(Debug)]
//! struct Deposit(u64);
//! impl Event for Deposit {}
//!
//! #[derive(Default)]
//! struct Ledger { total: AtomicU64 }
//!
//! impl Subscriber for Ledger {
//!     fn handlers(table: &mut HandlerTable<Self>) {
//!         table.on::<Deposit>(ThreadMode::Direct, |ledger, d| {
//!             ledger.total.fetch_add(d.0, Ordering::SeqCst);
//!             Ok(())
//!         });
//!     }
//! }
//!
//! let bus = EventBus::builder(BusConfig::default()).build()?;
//! let ledger = Arc::new(Ledger::default());
//! bus.register(&ledger)?;
//! bus.post(Deposit(5))?;
//! assert_eq!(ledger.total.load(Ordering::SeqCst), 5);
//! # Ok::<(), postbus::BusError>(())
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use crate::subscribers::HandlerTable;

/// A component that receives events.
pub trait Subscriber: Send + Sync + 'static {
    /// Declares the handlers of this subscriber type.
    ///
    /// Called once per subscriber type; the result is cached.
    fn handlers(table: &mut HandlerTable<Self>)
    where
        Self: Sized;
}

/// Identity of a registered subscriber (its `Arc` address).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

impl SubscriberId {
    /// Identity of `subscriber`.
    pub fn of<S: ?Sized>(subscriber: &Arc<S>) -> Self {
        Self(Arc::as_ptr(subscriber).cast::<()>() as usize)
    }
}

/// Shared handle to a registered subscriber.
///
/// Holds the `Arc` so the identity stays valid while any subscription exists.
#[derive(Clone)]
pub(crate) struct SubscriberRef {
    id: SubscriberId,
    name: &'static str,
    target: Arc<dyn Any + Send + Sync>,
}

impl SubscriberRef {
    pub(crate) fn new<S: Subscriber>(subscriber: &Arc<S>) -> Self {
        Self {
            id: SubscriberId::of(subscriber),
            name: type_name::<S>(),
            target: Arc::clone(subscriber) as Arc<dyn Any + Send + Sync>,
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    #[inline]
    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub(crate) fn target(&self) -> &(dyn Any + Send + Sync) {
        self.target.as_ref()
    }
}

impl fmt::Debug for SubscriberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRef")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
