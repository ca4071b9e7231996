//! # postbus
//!
//! **Postbus** is an in-process publish/subscribe event bus for Rust.
//!
//! Components register interest in typed events without depending on each other;
//! publishers post events without knowing who, if anyone, consumes them. Delivery is
//! polymorphic (subscribers of an ancestor or capability type receive descendants),
//! priority-ordered, and routed to one of four thread modes per handler.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Subscriber  │   │  Subscriber  │   │  Subscriber  │
//!     │ (component)  │   │ (component)  │   │ (component)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │ register         │ register_sticky  │ unregister
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  EventBus                                                         │
//! │  - HandlerDiscovery    (handler tables, cached per kind)          │
//! │  - SubscriptionRegistry (priority lists, copy-on-write snapshots) │
//! │  - StickyStore         (last event per concrete type)             │
//! │  - EventTypeResolver   (type → ancestors + capabilities, cached)  │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        │ post(event)
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  PostingContext (per thread, per bus)                             │
//! │  queue ─► drain ─► resolve ─► lookup snapshot ─► route            │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               ▼
//!     Direct             Affinity          Sequential      Concurrent
//!   (inline on         (AffinityExecutor  (SequentialWorker (WorkerPool,
//!    the poster)        FIFO, batched)     one at a time)    unordered)
//!        │                  │                  │               │
//!        └──────────────────┴───────┬──────────┴───────────────┘
//!                                   ▼
//!                    active? ─► handler ─► FaultPolicy
//!                                           (rethrow / log / SubscriberFaultEvent)
//! ```
//!
//! ### Reentrant posting
//! ```text
//! post(X) ──► handler A(X) posts Y ──► Y queued
//!         ──► handler B(X)
//!         ──► handler C(Y)             (Y after X's whole fan-out)
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                              |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------------|
//! | **Events**        | Typed events with declared ancestors and capabilities.       | [`Event`], [`AnyEvent`], [`EventType`]          |
//! | **Subscribers**   | Declarative handler tables with thread mode and priority.    | [`Subscriber`], [`HandlerTable`], [`ThreadMode`]|
//! | **Bus**           | Register, post, sticky events, cancellation.                 | [`EventBus`], [`BusBuilder`]                    |
//! | **Faults**        | Rethrow, log or emit handler faults.                         | [`FaultPolicy`], [`SubscriberFaultEvent`]       |
//! | **Executors**     | Plug in the host's main loop or use the built-in ones.       | [`AffinityExecutor`], [`AffinityLoop`]          |
//! | **Errors**        | Typed errors for bus misuse and handler faults.              | [`BusError`], [`HandlerFault`]                  |
//! | **Configuration** | Centralize bus settings.                                     | [`BusConfig`]                                   |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`DiagnosticLog`] subscriber _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use postbus::{BusConfig, Event, EventBus, HandlerTable, Subscriber, ThreadMode};
//!
//! #[derive(Debug, PartialEq)]
//! struct LoggedIn { user: String }
//! impl Event for LoggedIn {}
//!
//! #[derive(Default)]
//! struct Header { title: Mutex<String> }
//!
//! impl Subscriber for Header {
//!     fn handlers(table: &mut HandlerTable<Self>) {
//!         table.on::<LoggedIn>(ThreadMode::Direct, |header, e| {
//!             *header.title.lock() = format!("hello, {}", e.user);
//!             Ok(())
//!         });
//!     }
//! }
//!
//! fn main() -> Result<(), postbus::BusError> {
//!     let bus = EventBus::builder(BusConfig::default()).build()?;
//!
//!     // Posted before anyone listens: kept as the sticky LoggedIn event.
//!     bus.post_sticky(LoggedIn { user: "ada".into() })?;
//!
//!     // A late subscriber still receives it.
//!     let header = Arc::new(Header::default());
//!     bus.register_sticky(&header)?;
//!     assert_eq!(*header.title.lock(), "hello, ada");
//!
//!     bus.unregister(&header);
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod executors;
mod policies;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{BusBuilder, BusConfig, DEFAULT_AFFINITY_BATCH, EventBus};
pub use error::{BusError, HandlerFault, HandlerResult};
pub use events::{
    AnyEvent, Event, EventType, EventTypeResolver, NoSubscriberEvent, SubscriberFaultEvent,
};
pub use executors::{AffinityExecutor, AffinityLoop, Executor, Job, SequentialWorker, WorkerPool};
pub use policies::{FaultAction, FaultPolicy};
pub use subscribers::{
    Descriptors, HandlerDescriptor, HandlerDiscovery, HandlerFn, HandlerTable, Subscriber,
    SubscriberId, Subscription, ThreadMode,
};

// Optional: expose a simple built-in diagnostic logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::DiagnosticLog;
