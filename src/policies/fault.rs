//! # Fault policy for handler invocations.
//!
//! [`FaultPolicy`] decides what happens when a handler returns an error or panics.
//! The four outcomes map onto the bus configuration flags:
//!
//! ```text
//! rethrow_on_fault  log_on_fault  emit_fault_event   outcome
//!       true             -              -            error returned to the poster
//!       false          true           false          logged only
//!       false          true           true           logged + SubscriberFaultEvent posted
//!       false          false          false          suppressed
//! ```
//!
//! ## Rules
//! - Faults raised while handling a `SubscriberFaultEvent` are never rethrown and never
//!   wrapped into another `SubscriberFaultEvent`; they are only logged. Faults in
//!   `NoSubscriberEvent` handlers follow the regular rules.
//! - Rethrow only reaches the caller for Direct deliveries (and inline Affinity or
//!   Sequential deliveries). Queued deliveries have no caller: the router logs them.

use std::any::TypeId;

use crate::core::BusConfig;
use crate::events::{AnyEvent, SubscriberFaultEvent};

/// What to do with one handler fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultAction {
    /// Propagate the fault to the poster.
    Rethrow,
    /// Contain the fault.
    Report {
        /// Write the fault to the log.
        log: bool,
        /// Post a `SubscriberFaultEvent`.
        emit: bool,
    },
}

/// Disposal rules for handler faults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaultPolicy {
    /// Propagate faults to the poster.
    pub rethrow: bool,
    /// Log contained faults.
    pub log: bool,
    /// Post a `SubscriberFaultEvent` for contained faults.
    pub emit: bool,
}

impl FaultPolicy {
    /// Builds the policy from the fault flags of `cfg`.
    pub fn from_config(cfg: &BusConfig) -> Self {
        Self {
            rethrow: cfg.rethrow_on_fault,
            log: cfg.log_on_fault,
            emit: cfg.emit_fault_event,
        }
    }

    /// Policy that drops every fault silently.
    pub fn suppress() -> Self {
        Self {
            rethrow: false,
            log: false,
            emit: false,
        }
    }

    /// Decides the fate of a fault raised while handling `event`.
    pub fn decide(&self, event: &dyn AnyEvent) -> FaultAction {
        if event.event_type().id() == TypeId::of::<SubscriberFaultEvent>() {
            return FaultAction::Report {
                log: self.log,
                emit: false,
            };
        }
        if self.rethrow {
            FaultAction::Rethrow
        } else {
            FaultAction::Report {
                log: self.log,
                emit: self.emit,
            }
        }
    }
}

impl Default for FaultPolicy {
    /// Log and emit, never rethrow.
    fn default() -> Self {
        Self::from_config(&BusConfig::default())
    }
}
