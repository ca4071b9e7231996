//! # Subscription: one subscriber bound to one handler.
//!
//! The `active` flag is cleared by unregistration before the subscription is
//! detached from the registry, and every delivery path checks it right before
//! invoking. Queued deliveries for an unregistered subscriber are therefore dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::events::EventType;
use crate::subscribers::{HandlerDescriptor, SubscriberRef, ThreadMode};

/// Binding of one subscriber's handler to one event type.
#[derive(Debug)]
pub struct Subscription {
    subscriber: SubscriberRef,
    descriptor: Arc<HandlerDescriptor>,
    priority: i32,
    active: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(
        subscriber: SubscriberRef,
        descriptor: Arc<HandlerDescriptor>,
        priority: i32,
    ) -> Self {
        Self {
            subscriber,
            descriptor,
            priority,
            active: AtomicBool::new(true),
        }
    }

    /// Effective priority (registration override or the descriptor's own).
    #[inline]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Event type this subscription listens to.
    #[inline]
    pub fn event_type(&self) -> EventType {
        self.descriptor.event_type()
    }

    /// Delivery strategy.
    #[inline]
    pub fn thread_mode(&self) -> ThreadMode {
        self.descriptor.thread_mode()
    }

    /// Subscriber type name.
    #[inline]
    pub fn subscriber_name(&self) -> &'static str {
        self.subscriber.name()
    }

    /// Returns `false` once the subscriber has been unregistered.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub(crate) fn subscriber(&self) -> &SubscriberRef {
        &self.subscriber
    }

    pub(crate) fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    /// Same subscriber and same handler row.
    pub(crate) fn same_handler(&self, other: &Subscription) -> bool {
        self.subscriber.id() == other.subscriber.id() && *self.descriptor == *other.descriptor
    }
}
