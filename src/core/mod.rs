//! Bus core: registration, posting and delivery.
//!
//! The public API from this module is [`EventBus`], its [`BusBuilder`] and its
//! [`BusConfig`]. Everything else is internal machinery.
//!
//! Internal modules:
//! - [`registry`]: priority-ordered subscription lists with copy-on-write snapshots;
//! - [`sticky`]: last event per concrete type;
//! - [`posting`]: per-thread posting contexts, the drain loop and cancellation;
//! - [`router`]: thread-mode delivery, affinity batching and fault handling around
//!   each invocation;
//! - [`global`]: the process-wide default instance.

mod builder;
mod bus;
mod config;
mod global;
mod posting;
mod registry;
mod router;
mod sticky;

pub use builder::BusBuilder;
pub use bus::EventBus;
pub use config::{BusConfig, DEFAULT_AFFINITY_BATCH};
