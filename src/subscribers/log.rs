//! # DiagnosticLog: logs the bus's own diagnostic events
//!
//! A reference subscriber that writes [`NoSubscriberEvent`] and
//! [`SubscriberFaultEvent`] to `tracing`. Use it for tests or demos, or as a
//! template for routing diagnostics elsewhere.
//!
//! ## Example output
//! ```text
//! WARN postbus::subscribers::log: no subscriber event=app::Tick
//! ERROR postbus::subscribers::log: subscriber fault subscriber=app::Screen event=app::Tick panicked=true cause=boom
//! ```

use tracing::{error, warn};

use crate::events::{NoSubscriberEvent, SubscriberFaultEvent};
use crate::subscribers::{HandlerTable, Subscriber, ThreadMode};

/// Diagnostic event logger.
#[derive(Default)]
pub struct DiagnosticLog;

impl DiagnosticLog {
    /// Construct a new [`DiagnosticLog`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Subscriber for DiagnosticLog {
    fn handlers(table: &mut HandlerTable<Self>) {
        table
            .on::<NoSubscriberEvent>(ThreadMode::Direct, |_, e| {
                warn!(event = e.event.event_type().name(), "no subscriber");
                Ok(())
            })
            .on::<SubscriberFaultEvent>(ThreadMode::Direct, |_, e| {
                error!(
                    subscriber = e.subscriber,
                    event = e.causing_event.event_type().name(),
                    panicked = e.fault.panicked,
                    cause = %e.fault.cause,
                    "subscriber fault"
                );
                Ok(())
            });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tracing_test::traced_test;

    use super::*;
    use crate::core::{BusConfig, EventBus};
    use crate::events::Event;

    #[derive(Debug)]
    struct Orphan;
    impl Event for Orphan {}

    #[test]
    #[traced_test]
    fn logs_unhandled_events() {
        let bus = EventBus::builder(BusConfig::default()).build().unwrap();
        bus.register(&Arc::new(DiagnosticLog::new())).unwrap();
        bus.post(Orphan).unwrap();
        assert!(logs_contain("no subscriber"));
        assert!(logs_contain("Orphan"));
    }
}
