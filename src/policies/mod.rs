//! Fault handling policies.
//!
//! This module groups the knobs that control **what happens** when a handler fails.
//!
//! ## Contents
//! - [`FaultPolicy`] rethrow / log / emit flags
//! - [`FaultAction`] the decision taken for one fault
//!
//! ## Quick wiring
//! ```text
//! BusConfig { rethrow_on_fault, log_on_fault, emit_fault_event }
//!      └─► FaultPolicy::from_config    (or BusBuilder::with_fault_policy)
//!           └─► core::router invoke():
//!                - Rethrow        → BusError::HandlerInvocation to the poster
//!                - Report{log}    → error! with subscriber/event/cause fields
//!                - Report{emit}   → post(SubscriberFaultEvent)
//! ```
//!
//! ## Defaults
//! - `log = true`, `emit = true`, `rethrow = false`.

mod fault;

pub use fault::{FaultAction, FaultPolicy};
