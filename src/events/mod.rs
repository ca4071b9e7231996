//! Events: the event model, hierarchy resolution and diagnostic events.
//!
//! ## Contents
//! - [`Event`], [`AnyEvent`], [`EventType`] what can be posted and how it is identified
//! - [`EventTypeResolver`] expands a concrete type into its delivery closure
//! - [`NoSubscriberEvent`], [`SubscriberFaultEvent`] events the bus posts about itself
//!
//! See `core/mod.rs` for where resolution sits in the posting pipeline.

mod diagnostic;
mod event;
mod resolver;

pub(crate) use diagnostic::is_diagnostic;
pub use diagnostic::{NoSubscriberEvent, SubscriberFaultEvent};
pub use event::{AnyEvent, Event, EventType};
pub use resolver::EventTypeResolver;
