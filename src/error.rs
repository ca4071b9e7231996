//! Error types used by the postbus runtime and by subscriber handlers.
//!
//! This module defines two types:
//!
//! - [`BusError`]: errors raised by bus operations (registration, posting, cancellation).
//! - [`HandlerFault`]: a fault raised by one handler invocation, wrapped with the
//!   subscriber and event it happened on.
//!
//! Both provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::borrow::Cow;
use std::io;

use thiserror::Error;

/// Result type returned by subscriber handlers.
///
/// Any error (or a panic) returned from a handler becomes a [`HandlerFault`] and is
/// disposed of by the bus [`FaultPolicy`](crate::FaultPolicy).
pub type HandlerResult = anyhow::Result<()>;

/// # Errors produced by the bus.
///
/// Registration, unregistration and cancellation errors are returned synchronously
/// to the caller. Handler faults only surface here when the bus is configured with
/// `rethrow_on_fault`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BusError {
    /// The same handler of the same subscriber is already registered for the event type.
    #[error("subscriber {subscriber} already registered to event {event}")]
    DuplicateSubscription {
        /// Subscriber type name.
        subscriber: &'static str,
        /// Event type name.
        event: &'static str,
    },

    /// The subscriber exposes no handlers.
    #[error("subscriber {subscriber} has no handlers")]
    IllegalSubscriber {
        /// Subscriber type name.
        subscriber: &'static str,
    },

    /// `cancel_delivery` was called outside of its contract.
    #[error("invalid cancellation: {reason}")]
    InvalidCancellation {
        /// Which part of the contract was violated.
        reason: &'static str,
    },

    /// A handler failed and the bus is configured to rethrow.
    #[error(transparent)]
    HandlerInvocation(#[from] HandlerFault),

    /// Internal state of the posting engine is broken. Always a bug in the bus itself.
    #[error("internal error: {0}")]
    InternalInvariant(&'static str),

    /// A delivery thread or runtime could not be started.
    #[error("failed to start executor: {0}")]
    Spawn(#[from] io::Error),
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use postbus::BusError;
    ///
    /// let err = BusError::InvalidCancellation { reason: "not posting" };
    /// assert_eq!(err.as_label(), "bus_invalid_cancellation");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::DuplicateSubscription { .. } => "bus_duplicate_subscription",
            BusError::IllegalSubscriber { .. } => "bus_illegal_subscriber",
            BusError::InvalidCancellation { .. } => "bus_invalid_cancellation",
            BusError::HandlerInvocation(_) => "bus_handler_fault",
            BusError::InternalInvariant(_) => "bus_internal_invariant",
            BusError::Spawn(_) => "bus_spawn_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BusError::DuplicateSubscription { subscriber, event } => {
                format!("duplicate: subscriber={subscriber} event={event}")
            }
            BusError::IllegalSubscriber { subscriber } => {
                format!("no handlers: subscriber={subscriber}")
            }
            BusError::InvalidCancellation { reason } => format!("cancellation: {reason}"),
            BusError::HandlerInvocation(fault) => fault.as_message(),
            BusError::InternalInvariant(what) => format!("internal: {what}"),
            BusError::Spawn(e) => format!("spawn: {e}"),
        }
    }

    /// Indicates whether the error is a bug in the bus rather than misuse or a handler fault.
    ///
    /// # Example
    /// ```
    /// use postbus::BusError;
    ///
    /// assert!(BusError::InternalInvariant("abort state was not reset").is_fatal());
    /// assert!(!BusError::IllegalSubscriber { subscriber: "Screen" }.is_fatal());
    /// ```
    pub fn is_fatal(&self) -> bool {
        matches!(self, BusError::InternalInvariant(_))
    }
}

/// # Fault raised by one handler invocation.
///
/// Carries the failing subscriber and event type names and the original cause
/// (an error returned by the handler, or the message of a caught panic).
#[derive(Error, Debug)]
#[error("could not dispatch event {event} to subscriber {subscriber}: {cause}")]
pub struct HandlerFault {
    /// Subscriber type name.
    pub subscriber: &'static str,
    /// Concrete event type name.
    pub event: &'static str,
    /// Whether the cause was a panic rather than a returned error.
    pub panicked: bool,
    /// What the handler raised.
    #[source]
    pub cause: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl HandlerFault {
    /// Wraps an error returned by a handler.
    pub(crate) fn returned(
        subscriber: &'static str,
        event: &'static str,
        cause: anyhow::Error,
    ) -> Self {
        Self {
            subscriber,
            event,
            panicked: false,
            cause: cause.into(),
        }
    }

    /// Wraps a panic payload caught around a handler.
    pub(crate) fn panicked(subscriber: &'static str, event: &'static str, info: String) -> Self {
        Self {
            subscriber,
            event,
            panicked: true,
            cause: info.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        if self.panicked {
            "handler_panicked"
        } else {
            "handler_failed"
        }
    }

    /// Returns a human-readable message with details about the fault.
    pub fn as_message(&self) -> String {
        format!(
            "subscriber={} event={} cause={}",
            self.subscriber, self.event, self.cause
        )
    }
}

/// Extracts a readable message from a `catch_unwind` payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> Cow<'static, str> {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        Cow::Borrowed(msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        Cow::Owned(msg.clone())
    } else {
        Cow::Borrowed("unknown panic")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_message_names_subscriber_and_event() {
        let fault = HandlerFault::returned("Screen", "Tick", anyhow::anyhow!("boom"));
        assert_eq!(fault.as_label(), "handler_failed");
        assert_eq!(fault.as_message(), "subscriber=Screen event=Tick cause=boom");
        assert!(fault.to_string().contains("boom"));
    }

    #[test]
    fn invocation_error_is_transparent() {
        let err: BusError = HandlerFault::panicked("Screen", "Tick", "oops".into()).into();
        assert_eq!(err.as_label(), "bus_handler_fault");
        assert!(err.to_string().contains("oops"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn panic_message_handles_common_payloads() {
        let s: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
