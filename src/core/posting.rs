//! # Posting engine - per-context queues, draining and cancellation.
//!
//! Each calling thread owns one [`PostingContext`] per bus. A post appends to that
//! queue; only the call that finds the context idle drains it.
//!
//! ## Drain loop
//! ```text
//! post(X)
//!   ├─► queue.push(X)
//!   ├─► already draining? ──► return (the active drain will deliver X)
//!   └─► draining = true, on_affinity = is_affinity()   (captured once per drain)
//!         loop pop ─► post_single(event)
//!                       for ty in resolve(type(event)):
//!                         for sub in registry.lookup(ty):
//!                           current = (event, sub) ─► route ─► current = None
//!                           canceled? ─► stop this type, continue with the next type
//!                       nothing matched? ─► post(NoSubscriberEvent)   (queued)
//! ```
//!
//! ## Rules
//! - An event posted from a handler is delivered after the current event finished
//!   its whole fan-out (FIFO, breadth-first); the stack never grows per reentrant post.
//! - No `RefCell` borrow is held while a handler runs.
//! - Cancellation only stops the remaining subscribers of the type being delivered.
//! - If a handler fault is rethrown the drain stops; events still queued stay in the
//!   context and are delivered by the next post on this thread.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

use tracing::debug;

use super::bus::BusCore;
use crate::error::BusError;
use crate::events::{AnyEvent, EventType, NoSubscriberEvent, is_diagnostic};
use crate::subscribers::{Subscription, ThreadMode};

thread_local! {
    static CONTEXTS: RefCell<HashMap<u64, Rc<RefCell<PostingContext>>>> =
        RefCell::new(HashMap::new());
}

/// The event and subscription currently being delivered by a drain.
struct Delivery {
    event: Arc<dyn AnyEvent>,
    subscription: Arc<Subscription>,
}

/// Posting state of one bus on one thread.
#[derive(Default)]
pub(crate) struct PostingContext {
    queue: VecDeque<Arc<dyn AnyEvent>>,
    draining: bool,
    on_affinity: bool,
    current: Option<Delivery>,
    canceled: bool,
}

fn context(bus: u64) -> Rc<RefCell<PostingContext>> {
    CONTEXTS
        .try_with(|all| Rc::clone(all.borrow_mut().entry(bus).or_default()))
        // Thread-local storage is gone during thread teardown; post unshared.
        .unwrap_or_default()
}

fn release(bus: u64) {
    let _ = CONTEXTS.try_with(|all| all.borrow_mut().remove(&bus));
}

/// Existing context of `bus` on this thread, without creating one.
fn existing(bus: u64) -> Option<Rc<RefCell<PostingContext>>> {
    CONTEXTS
        .try_with(|all| all.borrow().get(&bus).cloned())
        .ok()
        .flatten()
}

/// Resets the drain flags when a drain ends, including on early return.
struct DrainGuard<'a> {
    bus: u64,
    ctx: &'a RefCell<PostingContext>,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        let idle = {
            let mut state = self.ctx.borrow_mut();
            state.draining = false;
            state.on_affinity = false;
            state.current = None;
            state.canceled = false;
            state.queue.is_empty()
        };
        if idle {
            release(self.bus);
        }
    }
}

impl BusCore {
    /// Queues `event` on the calling thread and drains unless a drain is in progress.
    pub(crate) fn post_erased(self: &Arc<Self>, event: Arc<dyn AnyEvent>) -> Result<(), BusError> {
        let ctx = context(self.id);
        {
            let mut state = ctx.borrow_mut();
            state.queue.push_back(event);
            if state.draining {
                return Ok(());
            }
            if state.canceled {
                return Err(BusError::InternalInvariant("abort state was not reset"));
            }
            state.draining = true;
            state.on_affinity = self.router.is_affinity();
        }

        let _guard = DrainGuard { bus: self.id, ctx: &ctx };
        loop {
            let next = ctx.borrow_mut().queue.pop_front();
            let Some(event) = next else {
                break;
            };
            self.post_single(&ctx, event)?;
        }
        Ok(())
    }

    fn post_single(
        self: &Arc<Self>,
        ctx: &RefCell<PostingContext>,
        event: Arc<dyn AnyEvent>,
    ) -> Result<(), BusError> {
        let types = self.resolver.resolve(event.event_type());
        let mut matched = false;
        for ty in types.iter() {
            matched |= self.post_to_type(ctx, &event, *ty)?;
        }
        if !matched {
            self.no_subscriber(event)?;
        }
        Ok(())
    }

    /// Delivers `event` to the subscribers of `ty`; returns whether there were any.
    fn post_to_type(
        self: &Arc<Self>,
        ctx: &RefCell<PostingContext>,
        event: &Arc<dyn AnyEvent>,
        ty: EventType,
    ) -> Result<bool, BusError> {
        let Some(subscriptions) = self.registry.lookup(ty.id()) else {
            return Ok(false);
        };
        if subscriptions.is_empty() {
            return Ok(false);
        }

        let on_affinity = ctx.borrow().on_affinity;
        for sub in subscriptions.iter() {
            ctx.borrow_mut().current = Some(Delivery {
                event: Arc::clone(event),
                subscription: Arc::clone(sub),
            });

            let delivered = self.router.route(self, sub, event, on_affinity);

            let aborted = {
                let mut state = ctx.borrow_mut();
                state.current = None;
                std::mem::take(&mut state.canceled)
            };
            delivered?;
            if aborted {
                debug!(
                    event = event.event_type().name(),
                    during = ty.name(),
                    subscriber = sub.subscriber_name(),
                    "delivery canceled"
                );
                break;
            }
        }
        Ok(true)
    }

    fn no_subscriber(self: &Arc<Self>, event: Arc<dyn AnyEvent>) -> Result<(), BusError> {
        if self.cfg.log_no_subscriber {
            debug!(event = event.event_type().name(), "no subscribers registered for event");
        }
        if self.cfg.emit_no_subscriber_event && !is_diagnostic(event.as_ref()) {
            self.post_erased(Arc::new(NoSubscriberEvent { event }))?;
        }
        Ok(())
    }

    /// Cancels delivery of the event at `event` to the remaining subscribers of the
    /// type currently being delivered.
    pub(crate) fn cancel(&self, event: *const ()) -> Result<(), BusError> {
        let invalid = |reason| Err(BusError::InvalidCancellation { reason });

        let Some(ctx) = existing(self.id) else {
            return invalid("only allowed from a handler on the posting thread");
        };
        let mut state = ctx.borrow_mut();
        if !state.draining {
            return invalid("only allowed from a handler on the posting thread");
        }
        let Some(current) = &state.current else {
            return invalid("only the currently handled event may be canceled");
        };
        let declared = current.subscription.event_type().id();
        let same_event = std::ptr::addr_eq(Arc::as_ptr(&current.event), event)
            || current
                .event
                .view_any(declared)
                .is_some_and(|viewed| std::ptr::addr_eq(std::ptr::from_ref(viewed), event));
        if !same_event {
            return invalid("only the currently handled event may be canceled");
        }
        if current.subscription.thread_mode() != ThreadMode::Direct {
            return invalid("only Direct handlers may cancel delivery");
        }
        state.canceled = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::core::{BusConfig, EventBus};

    fn count_unhandled(lines: &[&str], expected: usize) -> Result<(), String> {
        let hits = lines
            .iter()
            .filter(|l| l.contains("no subscribers registered"))
            .count();
        if hits == expected {
            Ok(())
        } else {
            Err(format!("expected {expected} unhandled events, got {hits}"))
        }
    }

    #[test]
    #[traced_test]
    fn unhandled_event_is_wrapped_exactly_once() {
        let bus = EventBus::builder(BusConfig::default()).build().unwrap();
        bus.post(Unheard).unwrap();
        // Unheard, then the NoSubscriberEvent nobody handles either.
        logs_assert(|lines: &[&str]| count_unhandled(lines, 2));
    }

    #[test]
    #[traced_test]
    fn unhandled_diagnostic_is_not_rewrapped() {
        let bus = EventBus::builder(BusConfig::default()).build().unwrap();
        bus.post(NoSubscriberEvent {
            event: Arc::new(Unheard),
        })
        .unwrap();
        logs_assert(|lines: &[&str]| count_unhandled(lines, 1));
    }

    #[test]
    fn contexts_are_per_bus_and_released_when_idle() {
        let a = context(1_000_001);
        a.borrow_mut().queue.push_back(Arc::new(Unheard));
        assert!(Rc::ptr_eq(&a, &context(1_000_001)));
        assert!(!Rc::ptr_eq(&a, &context(1_000_002)));

        {
            let _guard = DrainGuard {
                bus: 1_000_001,
                ctx: &a,
            };
        }
        // Queue still holds an event: the context must survive.
        assert!(existing(1_000_001).is_some());

        a.borrow_mut().queue.clear();
        {
            let _guard = DrainGuard {
                bus: 1_000_001,
                ctx: &a,
            };
        }
        assert!(existing(1_000_001).is_none());
        release(1_000_002);
    }

    #[derive(Debug)]
    struct Unheard;
    impl crate::events::Event for Unheard {}
}
