//! # Subscribers: handler declaration, discovery and subscriptions.
//!
//! ## Architecture
//! ```text
//! register(&Arc<S>)
//!     │
//!     ├──► HandlerDiscovery::find_handlers::<S>()      (cached per subscriber kind)
//!     │         └──► S::handlers(&mut HandlerTable<S>)  (declarative rows)
//!     │                   └──► Vec<HandlerDescriptor>  (event type, mode, priority, callback)
//!     │
//!     └──► Subscription { subscriber, descriptor, priority, active }
//!               └──► SubscriptionRegistry (core)
//! ```
//!
//! ## Contents
//! - [`Subscriber`] the trait components implement
//! - [`HandlerTable`], [`HandlerDescriptor`], [`ThreadMode`] handler declaration
//! - [`HandlerDiscovery`] per-kind descriptor cache
//! - [`Subscription`] the registered binding, with its active flag

mod discovery;
mod handler;
#[cfg(feature = "logging")]
mod log;
mod subscriber;
mod subscription;

pub use discovery::{Descriptors, HandlerDiscovery};
pub use handler::{HandlerDescriptor, HandlerFn, HandlerTable, ThreadMode};
#[cfg(feature = "logging")]
pub use log::DiagnosticLog;
pub(crate) use subscriber::SubscriberRef;
pub use subscriber::{Subscriber, SubscriberId};
pub use subscription::Subscription;
