//! # Diagnostic events posted by the bus itself.
//!
//! - [`NoSubscriberEvent`]: a posted event matched no subscription anywhere in its
//!   resolved closure (when `emit_no_subscriber_event` is on).
//! - [`SubscriberFaultEvent`]: a handler failed (when `emit_fault_event` is on).
//!
//! ## Rules
//! - Diagnostic events never produce further diagnostics: a diagnostic event without
//!   subscribers is not wrapped into a `NoSubscriberEvent`, and a fault while handling
//!   a `SubscriberFaultEvent` is never wrapped into another one.

use std::any::TypeId;
use std::sync::Arc;

use crate::error::HandlerFault;
use crate::events::{AnyEvent, Event};

/// Posted when an event reached no subscriber.
#[derive(Debug, Clone)]
pub struct NoSubscriberEvent {
    /// The event nobody subscribed to.
    pub event: Arc<dyn AnyEvent>,
}

impl Event for NoSubscriberEvent {}

/// Posted when a handler failed.
#[derive(Debug, Clone)]
pub struct SubscriberFaultEvent {
    /// Subscriber type name.
    pub subscriber: &'static str,
    /// Event whose delivery failed.
    pub causing_event: Arc<dyn AnyEvent>,
    /// The fault itself.
    pub fault: Arc<HandlerFault>,
}

impl Event for SubscriberFaultEvent {}

/// Returns `true` for events the bus posts about itself.
pub(crate) fn is_diagnostic(event: &dyn AnyEvent) -> bool {
    let id = event.event_type().id();
    id == TypeId::of::<NoSubscriberEvent>() || id == TypeId::of::<SubscriberFaultEvent>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Ping;
    impl Event for Ping {}

    #[test]
    fn only_bus_events_are_diagnostic() {
        let ping: Arc<dyn AnyEvent> = Arc::new(Ping);
        assert!(!is_diagnostic(ping.as_ref()));

        let no_sub = NoSubscriberEvent {
            event: ping.clone(),
        };
        assert!(is_diagnostic(&no_sub));

        let fault = SubscriberFaultEvent {
            subscriber: "Screen",
            causing_event: ping,
            fault: Arc::new(HandlerFault::panicked("Screen", "Ping", "boom".into())),
        };
        assert!(is_diagnostic(&fault));
    }
}
