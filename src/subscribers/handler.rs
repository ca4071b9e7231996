//! # Handler descriptors and the declarative handler table.
//!
//! A subscriber declares its handlers in a [`HandlerTable`]: one row per handled
//! event type with its [`ThreadMode`], priority and callback. The bus turns each
//! row into an immutable [`HandlerDescriptor`].
//!
//! ## Example
//! ```rust
//! use postbus::{Event, HandlerTable, Subscriber, ThreadMode};
//!
//! #[derive(Debug)]
//! struct Tick(u64);
//! impl Event for Tick {}
//!
//! struct Clock;
//!
//! impl Subscriber for Clock {
//!     fn handlers(table: &mut HandlerTable<Self>) {
//!         table
//!             .on::<Tick>(ThreadMode::Direct, |_clock, tick| {
//!                 assert!(tick.0 > 0);
//!                 Ok(())
//!             })
//!             .on_prioritized::<Tick>(ThreadMode::Concurrent, 10, |_clock, _tick| Ok(()));
//!     }
//! }
//! ```

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::anyhow;

use crate::error::HandlerResult;
use crate::events::{AnyEvent, Event, EventType};
use crate::subscribers::Subscriber;

/// Delivery strategy of a handler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ThreadMode {
    /// Invoked inline on the posting thread (default).
    #[default]
    Direct,
    /// Invoked on the affinity context; inline if the poster is already there.
    Affinity,
    /// Invoked one at a time on the sequential worker when posted from the affinity
    /// context; inline otherwise.
    Sequential,
    /// Always handed to the worker pool; no ordering between invocations.
    Concurrent,
}

impl ThreadMode {
    /// Returns a short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ThreadMode::Direct => "direct",
            ThreadMode::Affinity => "affinity",
            ThreadMode::Sequential => "sequential",
            ThreadMode::Concurrent => "concurrent",
        }
    }
}

/// Type-erased handler callback: `(subscriber, event) -> result`.
pub type HandlerFn =
    Arc<dyn Fn(&(dyn Any + Send + Sync), &dyn AnyEvent) -> HandlerResult + Send + Sync>;

/// One handler of one subscriber kind. Immutable once produced.
///
/// Two descriptors are equal when they come from the same table row of the same
/// subscriber kind.
#[derive(Clone)]
pub struct HandlerDescriptor {
    event_type: EventType,
    thread_mode: ThreadMode,
    priority: i32,
    owner: TypeId,
    ordinal: usize,
    callback: HandlerFn,
}

impl HandlerDescriptor {
    /// Event type this handler is declared for.
    #[inline]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Delivery strategy.
    #[inline]
    pub fn thread_mode(&self) -> ThreadMode {
        self.thread_mode
    }

    /// Declared priority (higher = earlier).
    #[inline]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Position of the row in the subscriber's table.
    #[inline]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Calls the handler.
    pub(crate) fn invoke(&self, target: &(dyn Any + Send + Sync), event: &dyn AnyEvent) -> HandlerResult {
        (self.callback)(target, event)
    }
}

impl PartialEq for HandlerDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner
            && self.ordinal == other.ordinal
            && self.event_type == other.event_type
    }
}

impl Eq for HandlerDescriptor {}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("event_type", &self.event_type)
            .field("thread_mode", &self.thread_mode)
            .field("priority", &self.priority)
            .field("ordinal", &self.ordinal)
            .finish_non_exhaustive()
    }
}

/// Declarative table of the handlers a subscriber of type `S` exposes.
pub struct HandlerTable<S> {
    rows: Vec<HandlerDescriptor>,
    _subscriber: PhantomData<fn(&S)>,
}

impl<S: Subscriber> HandlerTable<S> {
    pub(crate) fn new() -> Self {
        Self {
            rows: Vec::new(),
            _subscriber: PhantomData,
        }
    }

    /// Adds a handler for `E` with priority 0.
    pub fn on<E: Event>(
        &mut self,
        mode: ThreadMode,
        f: impl Fn(&S, &E) -> HandlerResult + Send + Sync + 'static,
    ) -> &mut Self {
        self.on_prioritized::<E>(mode, 0, f)
    }

    /// Adds a handler for `E` with an explicit priority.
    ///
    /// `E` may be an ancestor of the posted type; the handler then sees the event
    /// through [`Event::view`].
    pub fn on_prioritized<E: Event>(
        &mut self,
        mode: ThreadMode,
        priority: i32,
        f: impl Fn(&S, &E) -> HandlerResult + Send + Sync + 'static,
    ) -> &mut Self {
        let callback: HandlerFn = Arc::new(
            move |target: &(dyn Any + Send + Sync), event: &dyn AnyEvent| -> HandlerResult {
                let subscriber = downcast_subscriber::<S>(target)?;
                let viewed = event.view::<E>().ok_or_else(|| {
                    anyhow!(
                        "event {} has no view as {}",
                        event.event_type(),
                        type_name::<E>()
                    )
                })?;
                f(subscriber, viewed)
            },
        );
        self.push(EventType::of::<E>(), mode, priority, callback)
    }

    /// Adds a handler for `E` that receives the erased event.
    ///
    /// Use this for capability types, which have no concrete value to view.
    pub fn on_erased<E: Event>(
        &mut self,
        mode: ThreadMode,
        priority: i32,
        f: impl Fn(&S, &dyn AnyEvent) -> HandlerResult + Send + Sync + 'static,
    ) -> &mut Self {
        let callback: HandlerFn = Arc::new(
            move |target: &(dyn Any + Send + Sync), event: &dyn AnyEvent| -> HandlerResult {
                f(downcast_subscriber::<S>(target)?, event)
            },
        );
        self.push(EventType::of::<E>(), mode, priority, callback)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if no handler was declared.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn into_descriptors(self) -> Vec<HandlerDescriptor> {
        self.rows
    }

    fn push(
        &mut self,
        event_type: EventType,
        thread_mode: ThreadMode,
        priority: i32,
        callback: HandlerFn,
    ) -> &mut Self {
        let ordinal = self.rows.len();
        self.rows.push(HandlerDescriptor {
            event_type,
            thread_mode,
            priority,
            owner: TypeId::of::<S>(),
            ordinal,
            callback,
        });
        self
    }
}

fn downcast_subscriber<S: Subscriber>(target: &(dyn Any + Send + Sync)) -> anyhow::Result<&S> {
    target
        .downcast_ref::<S>()
        .ok_or_else(|| anyhow!("subscriber is not a {}", type_name::<S>()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Tick(u32);
    impl Event for Tick {}

    #[derive(Debug)]
    struct Tock;
    impl Event for Tock {}

    struct Clock;
    impl Subscriber for Clock {
        fn handlers(table: &mut HandlerTable<Self>) {
            table
                .on::<Tick>(ThreadMode::Direct, |_, tick| {
                    anyhow::ensure!(tick.0 < 10, "tick too large");
                    Ok(())
                })
                .on_erased::<Tock>(ThreadMode::Affinity, 3, |_, _| Ok(()));
        }
    }

    fn descriptors() -> Vec<HandlerDescriptor> {
        let mut table = HandlerTable::<Clock>::new();
        Clock::handlers(&mut table);
        table.into_descriptors()
    }

    #[test]
    fn rows_keep_declaration_order() {
        let rows = descriptors();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].event_type(), EventType::of::<Tick>());
        assert_eq!(rows[0].thread_mode(), ThreadMode::Direct);
        assert_eq!(rows[0].priority(), 0);
        assert_eq!(rows[1].event_type(), EventType::of::<Tock>());
        assert_eq!(rows[1].thread_mode(), ThreadMode::Affinity);
        assert_eq!(rows[1].priority(), 3);
        assert_eq!(rows[1].ordinal(), 1);
    }

    #[test]
    fn descriptors_from_the_same_row_are_equal() {
        let a = descriptors();
        let b = descriptors();
        assert_eq!(a[0], b[0]);
        assert_ne!(a[0], a[1]);
    }

    #[test]
    fn typed_callback_downcasts_subscriber_and_event() {
        let rows = descriptors();
        let clock = Clock;
        assert!(rows[0].invoke(&clock, &Tick(1)).is_ok());
        assert!(rows[0].invoke(&clock, &Tick(11)).is_err());
        // Wrong event type is reported as a fault, not a panic.
        assert!(rows[0].invoke(&clock, &Tock).is_err());
        // Wrong subscriber type likewise.
        assert!(rows[0].invoke(&7u8, &Tick(1)).is_err());
    }
}
