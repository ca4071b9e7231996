//! # Handler discovery with a per-kind cache.
//!
//! [`HandlerDiscovery`] asks a subscriber type for its [`HandlerTable`] once and
//! caches the resulting descriptors by type, so registering many subscribers of
//! the same kind does not rebuild the table.

use std::any::{TypeId, type_name};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::error::BusError;
use crate::subscribers::{HandlerDescriptor, HandlerTable, Subscriber};

/// Shared, ordered descriptor list of one subscriber kind.
pub type Descriptors = Arc<[Arc<HandlerDescriptor>]>;

/// Produces and caches handler descriptors per subscriber kind.
#[derive(Default)]
pub struct HandlerDiscovery {
    cache: DashMap<TypeId, Descriptors>,
}

impl HandlerDiscovery {
    /// Creates an empty discovery cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handlers declared by `S`, in declaration order.
    ///
    /// Fails with [`BusError::IllegalSubscriber`] if `S` declares none.
    pub fn find_handlers<S: Subscriber>(&self) -> Result<Descriptors, BusError> {
        let kind = TypeId::of::<S>();
        if let Some(hit) = self.cache.get(&kind) {
            return Ok(Arc::clone(hit.value()));
        }

        let mut table = HandlerTable::<S>::new();
        S::handlers(&mut table);
        if table.is_empty() {
            return Err(BusError::IllegalSubscriber {
                subscriber: type_name::<S>(),
            });
        }

        let found: Descriptors = table.into_descriptors().into_iter().map(Arc::new).collect();
        trace!(subscriber = type_name::<S>(), handlers = found.len(), "discovered handlers");
        let entry = self.cache.entry(kind).or_insert(found);
        Ok(Arc::clone(entry.value()))
    }

    /// Drops every cached descriptor list.
    pub fn clear(&self) {
        self.cache.clear();
    }
}
