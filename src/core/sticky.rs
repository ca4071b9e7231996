//! # Sticky store - last event per concrete type.
//!
//! Every operation runs under one lock, so put/get/remove are linearizable. Entries
//! of different concrete types are independent even when one type is an ancestor of
//! the other.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::events::AnyEvent;

#[derive(Default)]
pub(crate) struct StickyStore {
    entries: Mutex<HashMap<TypeId, Arc<dyn AnyEvent>>>,
}

impl StickyStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stores `event` as the entry of its concrete type, returning the one it replaced.
    pub(crate) fn put(&self, event: Arc<dyn AnyEvent>) -> Option<Arc<dyn AnyEvent>> {
        let ty = event.event_type().id();
        self.entries.lock().insert(ty, event)
    }

    pub(crate) fn get(&self, ty: TypeId) -> Option<Arc<dyn AnyEvent>> {
        self.entries.lock().get(&ty).cloned()
    }

    pub(crate) fn remove(&self, ty: TypeId) -> Option<Arc<dyn AnyEvent>> {
        self.entries.lock().remove(&ty)
    }

    /// Removes the entry of `ty` if `matches` accepts it.
    pub(crate) fn remove_if(&self, ty: TypeId, matches: impl FnOnce(&dyn AnyEvent) -> bool) -> bool {
        let mut entries = self.entries.lock();
        let hit = entries.get(&ty).is_some_and(|stored| matches(stored.as_ref()));
        if hit {
            entries.remove(&ty);
        }
        hit
    }

    pub(crate) fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Copy of all entries; replay iterates it without holding the lock.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn AnyEvent>> {
        self.entries.lock().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventType};

    #[derive(Debug, PartialEq)]
    struct Level(u8);
    impl Event for Level {}

    #[derive(Debug, PartialEq)]
    struct Critical(u8);
    impl Event for Critical {
        fn parent() -> Option<EventType> {
            Some(EventType::of::<Level>())
        }
    }

    #[test]
    fn one_entry_per_concrete_type() {
        let store = StickyStore::new();
        assert!(store.put(Arc::new(Level(1))).is_none());
        let replaced = store.put(Arc::new(Level(2))).unwrap();
        assert_eq!(replaced.downcast_ref::<Level>(), Some(&Level(1)));
        store.put(Arc::new(Critical(9)));

        let level = store.get(TypeId::of::<Level>()).unwrap();
        assert_eq!(level.downcast_ref::<Level>(), Some(&Level(2)));
        assert_eq!(store.snapshot().len(), 2);

        store.remove(TypeId::of::<Level>());
        assert!(store.get(TypeId::of::<Level>()).is_none());
        assert!(store.get(TypeId::of::<Critical>()).is_some());
    }

    #[test]
    fn remove_if_checks_the_stored_value() {
        let store = StickyStore::new();
        store.put(Arc::new(Level(3)));
        let is = |n: u8| move |e: &dyn AnyEvent| e.downcast_ref::<Level>() == Some(&Level(n));

        assert!(!store.remove_if(TypeId::of::<Level>(), is(4)));
        assert!(store.remove_if(TypeId::of::<Level>(), is(3)));
        assert!(!store.remove_if(TypeId::of::<Level>(), is(3)));

        store.put(Arc::new(Level(1)));
        store.clear();
        assert!(store.snapshot().is_empty());
    }
}
