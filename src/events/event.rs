//! # Event trait, erased events and event type descriptors.
//!
//! Every value posted on the bus implements [`Event`]. Hierarchy is declared rather
//! than discovered: an event names its parent type and the capability sets it
//! implements, and the [`EventTypeResolver`](crate::events::EventTypeResolver)
//! expands that into the delivery closure.
//!
//! ## Hierarchy
//! ```text
//! Bark ──parent──► Sound ──capability──► Audible ──capability──► Signal
//!   └──capability──► Loud
//! ```
//!
//! A handler registered for `Sound` receives a posted `Bark`. Typed handlers see the
//! event through [`Event::view`]; capability types (marker types that are never
//! instantiated) are usually handled with erased handlers receiving `&dyn AnyEvent`.
//!
//! ## Example
//! ```rust
//! use std::any::{Any, TypeId};
//! use postbus::{AnyEvent, Event, EventType};
//!
//! #[derive(Debug)]
//! struct Sound { volume: u8 }
//! impl Event for Sound {}
//!
//! #[derive(Debug)]
//! struct Bark { sound: Sound }
//! impl Event for Bark {
//!     fn parent() -> Option<EventType> { Some(EventType::of::<Sound>()) }
//!     fn view(&self, ty: TypeId) -> Option<&dyn Any> {
//!         (ty == TypeId::of::<Sound>()).then_some(&self.sound as &dyn Any)
//!     }
//! }
//!
//! let ev: &dyn AnyEvent = &Bark { sound: Sound { volume: 9 } };
//! assert!(ev.is::<Bark>());
//! assert_eq!(ev.view::<Sound>().map(|s| s.volume), Some(9));
//! ```

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A value that can be posted on the bus.
///
/// All methods have defaults: a plain `impl Event for MyEvent {}` declares a root
/// event type without capabilities.
pub trait Event: Any + Send + Sync + fmt::Debug {
    /// Direct ancestor of this event type, if any.
    fn parent() -> Option<EventType>
    where
        Self: Sized,
    {
        None
    }

    /// Capability sets implemented directly by this type, in declaration order.
    fn capabilities() -> Vec<EventType>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// Projects this event onto one of its ancestor types.
    ///
    /// Called only for types other than `Self`; return `None` when the event has no
    /// concrete representation of `ty`.
    fn view(&self, ty: TypeId) -> Option<&dyn Any> {
        let _ = ty;
        None
    }
}

/// Descriptor of an event type: identity plus the links needed to expand its hierarchy.
///
/// Equality and hashing use the [`TypeId`] only.
#[derive(Clone, Copy)]
pub struct EventType {
    id: TypeId,
    name: &'static str,
    parent: fn() -> Option<EventType>,
    capabilities: fn() -> Vec<EventType>,
}

impl EventType {
    /// Returns the descriptor of `E`.
    pub fn of<E: Event>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: type_name::<E>(),
            parent: <E as Event>::parent,
            capabilities: <E as Event>::capabilities,
        }
    }

    /// Type identity.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Full type name, used in logs and errors.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Direct ancestor type.
    #[inline]
    pub fn parent(&self) -> Option<EventType> {
        (self.parent)()
    }

    /// Directly implemented capability sets.
    #[inline]
    pub fn capabilities(&self) -> Vec<EventType> {
        (self.capabilities)()
    }
}

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventType {}

impl Hash for EventType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventType").field(&self.name).finish()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Object-safe, type-erased form of an [`Event`].
///
/// Implemented for every `Event`; the bus moves events around as `Arc<dyn AnyEvent>`.
pub trait AnyEvent: Send + Sync + fmt::Debug + 'static {
    /// Descriptor of the concrete type.
    fn event_type(&self) -> EventType;

    /// The event as `&dyn Any` (concrete type).
    fn as_any(&self) -> &dyn Any;

    /// The event viewed as `ty`: itself for its own type, otherwise [`Event::view`].
    fn view_any(&self, ty: TypeId) -> Option<&dyn Any>;

    /// Converts a shared erased event into a shared `Any` for downcasting.
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<E: Event> AnyEvent for E {
    fn event_type(&self) -> EventType {
        EventType::of::<E>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn view_any(&self, ty: TypeId) -> Option<&dyn Any> {
        if ty == TypeId::of::<E>() {
            Some(self)
        } else {
            Event::view(self, ty)
        }
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl dyn AnyEvent {
    /// Returns `true` if the concrete type is `T`.
    #[inline]
    pub fn is<T: Event>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Downcasts to the concrete type.
    #[inline]
    pub fn downcast_ref<T: Event>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Views the event as `T`, which is its own type or a projected ancestor.
    #[inline]
    pub fn view<T: Event>(&self) -> Option<&T> {
        self.view_any(TypeId::of::<T>())?.downcast_ref::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Base(u32);
    impl Event for Base {}

    #[derive(Debug)]
    struct Derived {
        base: Base,
    }
    impl Event for Derived {
        fn parent() -> Option<EventType> {
            Some(EventType::of::<Base>())
        }

        fn view(&self, ty: TypeId) -> Option<&dyn Any> {
            (ty == TypeId::of::<Base>()).then_some(&self.base as &dyn Any)
        }
    }

    #[test]
    fn event_type_identity_is_type_id() {
        assert_eq!(EventType::of::<Base>(), EventType::of::<Base>());
        assert_ne!(EventType::of::<Base>(), EventType::of::<Derived>());
        assert!(EventType::of::<Derived>().name().ends_with("Derived"));
        assert_eq!(
            EventType::of::<Derived>().parent(),
            Some(EventType::of::<Base>())
        );
        assert!(EventType::of::<Base>().parent().is_none());
    }

    #[test]
    fn erased_event_downcasts_and_views() {
        let ev: Arc<dyn AnyEvent> = Arc::new(Derived { base: Base(3) });
        assert!(ev.is::<Derived>());
        assert!(ev.downcast_ref::<Base>().is_none());
        assert_eq!(ev.view::<Base>().map(|b| b.0), Some(3));
        assert!(ev.view::<Derived>().is_some());

        let any = ev.into_any_arc();
        assert!(any.downcast::<Derived>().is_ok());
    }
}
