//! # Event type resolution for polymorphic delivery.
//!
//! [`EventTypeResolver`] expands a concrete event type into the ordered list of
//! types whose subscribers receive it:
//!
//! ```text
//! resolve(Bark):
//!   Bark, <capabilities of Bark, depth-first>,
//!   Sound, <capabilities of Sound, depth-first>,
//!   ... up to the root type
//! ```
//!
//! ## Rules
//! - Capabilities are expanded depth-first and each type appears at most once.
//! - Results are cached per concrete type until [`EventTypeResolver::clear`].
//! - With hierarchy resolution disabled, `resolve` returns only the concrete type.

use std::any::TypeId;
use std::sync::Arc;

use dashmap::DashMap;

use crate::events::EventType;

/// Computes and caches the delivery closure of concrete event types.
pub struct EventTypeResolver {
    hierarchy: bool,
    cache: DashMap<TypeId, Arc<[EventType]>>,
}

impl EventTypeResolver {
    /// Creates a resolver; `hierarchy = false` disables ancestor/capability expansion.
    pub fn new(hierarchy: bool) -> Self {
        Self {
            hierarchy,
            cache: DashMap::new(),
        }
    }

    /// Returns `ty` followed by its capabilities and ancestors.
    pub fn resolve(&self, ty: EventType) -> Arc<[EventType]> {
        if !self.hierarchy {
            return Arc::from([ty]);
        }
        if let Some(hit) = self.cache.get(&ty.id()) {
            return Arc::clone(hit.value());
        }

        let closure: Arc<[EventType]> = expand(ty).into();
        // A racing resolver may have inserted first; both computed the same list.
        let entry = self.cache.entry(ty.id()).or_insert(closure);
        Arc::clone(entry.value())
    }

    /// Returns `true` if `candidate` is `declared` or one of its descendants.
    pub fn is_a(&self, candidate: EventType, declared: EventType) -> bool {
        candidate == declared || self.resolve(candidate).contains(&declared)
    }

    /// Drops every cached closure.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Number of cached closures.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

fn expand(ty: EventType) -> Vec<EventType> {
    let mut out = Vec::new();
    let mut current = Some(ty);
    while let Some(t) = current {
        if !out.contains(&t) {
            out.push(t);
        }
        add_capabilities(&mut out, t.capabilities());
        current = t.parent();
    }
    out
}

fn add_capabilities(out: &mut Vec<EventType>, caps: Vec<EventType>) {
    for cap in caps {
        if !out.contains(&cap) {
            out.push(cap);
            add_capabilities(out, cap.capabilities());
        }
    }
}
