//! # Subscription registry - who listens to what.
//!
//! Keeps two indexes under one lock:
//! - **forward**: event type → priority-ordered subscription list
//! - **reverse**: subscriber → event types it is subscribed to
//!
//! ## Architecture
//! ```text
//! register(subscriber, descriptors)
//!     ├─► validate every descriptor (duplicates → error, nothing inserted)
//!     └─► for each descriptor: copy list, priority-insert, publish new snapshot
//!
//! unregister(subscriber)
//!     └─► for each type in reverse index: deactivate matches, publish list without them
//!
//! lookup(type) ──► Arc<[Arc<Subscription>]>   (never mutated once published)
//! ```
//!
//! ## Rules
//! - Lists are ordered by non-increasing priority; equal priorities keep registration
//!   order (insert before the first entry with strictly lower priority).
//! - A published snapshot is immutable: dispatch iterates it without any lock while
//!   registration publishes a fresh list.
//! - Subscriptions are marked inactive before they are detached.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::BusError;
use crate::events::EventType;
use crate::subscribers::{HandlerDescriptor, SubscriberId, SubscriberRef, Subscription};

/// Immutable subscription list of one event type.
pub(crate) type Snapshot = Arc<[Arc<Subscription>]>;

#[derive(Default)]
struct Indexes {
    by_type: HashMap<TypeId, Snapshot>,
    by_subscriber: HashMap<SubscriberId, Vec<EventType>>,
}

/// Priority-ordered subscription lists with a reverse index for unregistration.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    inner: Mutex<Indexes>,
}

impl SubscriptionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts one subscription per descriptor.
    ///
    /// `priority` overrides the descriptors' own priorities when given. Fails without
    /// touching either index if any descriptor is already registered for `subscriber`.
    pub(crate) fn register(
        &self,
        subscriber: SubscriberRef,
        descriptors: &[Arc<HandlerDescriptor>],
        priority: Option<i32>,
    ) -> Result<Vec<Arc<Subscription>>, BusError> {
        let added: Vec<Arc<Subscription>> = descriptors
            .iter()
            .map(|d| {
                Arc::new(Subscription::new(
                    subscriber.clone(),
                    Arc::clone(d),
                    priority.unwrap_or(d.priority()),
                ))
            })
            .collect();

        let mut guard = self.inner.lock();
        let idx = &mut *guard;

        for sub in &added {
            let ty = sub.event_type();
            let duplicate = idx
                .by_type
                .get(&ty.id())
                .is_some_and(|list| list.iter().any(|s| s.same_handler(sub)));
            if duplicate {
                return Err(BusError::DuplicateSubscription {
                    subscriber: subscriber.name(),
                    event: ty.name(),
                });
            }
        }

        for sub in &added {
            let ty = sub.event_type();
            let next = {
                let current: &[Arc<Subscription>] =
                    idx.by_type.get(&ty.id()).map(|list| &list[..]).unwrap_or(&[]);
                insert_by_priority(current, Arc::clone(sub))
            };
            idx.by_type.insert(ty.id(), next);

            let types = idx.by_subscriber.entry(subscriber.id()).or_default();
            if !types.contains(&ty) {
                types.push(ty);
            }
        }

        Ok(added)
    }

    /// Deactivates and detaches every subscription of `subscriber`.
    ///
    /// Returns `false` if the subscriber was not registered.
    pub(crate) fn unregister(&self, subscriber: SubscriberId) -> bool {
        let mut guard = self.inner.lock();
        let idx = &mut *guard;

        let Some(types) = idx.by_subscriber.remove(&subscriber) else {
            return false;
        };

        for ty in types {
            let Some(list) = idx.by_type.get(&ty.id()) else {
                continue;
            };
            let mut kept = Vec::with_capacity(list.len());
            for sub in list.iter() {
                if sub.subscriber().id() == subscriber {
                    sub.deactivate();
                } else {
                    kept.push(Arc::clone(sub));
                }
            }
            if kept.is_empty() {
                idx.by_type.remove(&ty.id());
            } else {
                idx.by_type.insert(ty.id(), kept.into());
            }
        }
        true
    }

    /// Current subscription list of `ty`.
    pub(crate) fn lookup(&self, ty: TypeId) -> Option<Snapshot> {
        self.inner.lock().by_type.get(&ty).cloned()
    }

    pub(crate) fn is_registered(&self, subscriber: SubscriberId) -> bool {
        self.inner.lock().by_subscriber.contains_key(&subscriber)
    }

    pub(crate) fn has_subscribers(&self, ty: TypeId) -> bool {
        self.inner
            .lock()
            .by_type
            .get(&ty)
            .is_some_and(|list| !list.is_empty())
    }
}

fn insert_by_priority(current: &[Arc<Subscription>], sub: Arc<Subscription>) -> Snapshot {
    let at = current
        .iter()
        .position(|s| s.priority() < sub.priority())
        .unwrap_or(current.len());

    let mut next = Vec::with_capacity(current.len() + 1);
    next.extend_from_slice(&current[..at]);
    next.push(sub);
    next.extend_from_slice(&current[at..]);
    next.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use crate::subscribers::{HandlerDiscovery, HandlerTable, Subscriber, ThreadMode};

    #[derive(Debug)]
    struct Ping;
    impl Event for Ping {}

    #[derive(Debug)]
    struct Pong;
    impl Event for Pong {}

    struct Both;
    impl Subscriber for Both {
        fn handlers(table: &mut HandlerTable<Self>) {
            table
                .on::<Ping>(ThreadMode::Direct, |_, _| Ok(()))
                .on_prioritized::<Pong>(ThreadMode::Direct, 5, |_, _| Ok(()));
        }
    }

    fn register(
        reg: &SubscriptionRegistry,
        sub: &Arc<Both>,
        priority: Option<i32>,
    ) -> Result<Vec<Arc<Subscription>>, BusError> {
        let descriptors = HandlerDiscovery::new().find_handlers::<Both>().unwrap();
        reg.register(SubscriberRef::new(sub), &descriptors, priority)
    }

    fn owners(reg: &SubscriptionRegistry, ty: TypeId) -> Vec<SubscriberId> {
        reg.lookup(ty)
            .map(|list| list.iter().map(|s| s.subscriber().id()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn lists_are_priority_ordered_and_stable() {
        let reg = SubscriptionRegistry::new();
        let (a, b, c, d) = (
            Arc::new(Both),
            Arc::new(Both),
            Arc::new(Both),
            Arc::new(Both),
        );
        register(&reg, &a, Some(1)).unwrap();
        register(&reg, &b, Some(5)).unwrap();
        register(&reg, &c, Some(1)).unwrap();
        register(&reg, &d, Some(-3)).unwrap();

        let expected = [&b, &a, &c, &d].map(SubscriberId::of).to_vec();
        assert_eq!(owners(&reg, TypeId::of::<Ping>()), expected);
    }

    #[test]
    fn descriptor_priority_applies_without_override() {
        let reg = SubscriptionRegistry::new();
        let added = register(&reg, &Arc::new(Both), None).unwrap();
        let priorities: Vec<i32> = added.iter().map(|s| s.priority()).collect();
        assert_eq!(priorities, vec![0, 5]);
    }

    #[test]
    fn duplicate_is_rejected_without_side_effects() {
        let reg = SubscriptionRegistry::new();
        let a = Arc::new(Both);
        let b = Arc::new(Both);
        register(&reg, &a, None).unwrap();
        register(&reg, &b, None).unwrap();
        let before = reg.lookup(TypeId::of::<Ping>()).unwrap();

        let err = register(&reg, &a, Some(100)).unwrap_err();
        assert!(matches!(err, BusError::DuplicateSubscription { .. }));

        let after = reg.lookup(TypeId::of::<Ping>()).unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(owners(&reg, TypeId::of::<Pong>()).len(), 2);
    }

    #[test]
    fn unregister_deactivates_and_keeps_indexes_consistent() {
        let reg = SubscriptionRegistry::new();
        let a = Arc::new(Both);
        let b = Arc::new(Both);
        let added = register(&reg, &a, None).unwrap();
        register(&reg, &b, None).unwrap();

        let snapshot = reg.lookup(TypeId::of::<Ping>()).unwrap();
        assert!(reg.unregister(SubscriberId::of(&a)));

        assert!(added.iter().all(|s| !s.is_active()));
        assert!(!reg.is_registered(SubscriberId::of(&a)));
        assert!(reg.is_registered(SubscriberId::of(&b)));
        assert_eq!(owners(&reg, TypeId::of::<Ping>()), vec![SubscriberId::of(&b)]);
        // A snapshot taken before unregistration is left untouched.
        assert_eq!(snapshot.len(), 2);

        assert!(!reg.unregister(SubscriberId::of(&a)));
        assert!(reg.unregister(SubscriberId::of(&b)));
        assert!(!reg.has_subscribers(TypeId::of::<Ping>()));
        assert!(reg.lookup(TypeId::of::<Pong>()).is_none());
    }
}
