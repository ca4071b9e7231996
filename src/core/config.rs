//! # Bus configuration.
//!
//! Provides [`BusConfig`], the settings of one [`EventBus`](crate::EventBus) instance.
//!
//! Config is used in two ways:
//! 1. **Bus creation**: `EventBus::builder(config).build()`
//! 2. **Fault policy**: `FaultPolicy::from_config(&config)`
//!
//! ## Sentinel values
//! - `affinity_batch = 0` → treated as 1
//! - `worker_threads = 0` → tokio's default blocking-pool limit

/// Default number of affinity deliveries run per executor job.
pub const DEFAULT_AFFINITY_BATCH: usize = 10;

/// Configuration of one bus instance.
///
/// Defines:
/// - **Type resolution**: whether ancestors and capabilities receive an event
/// - **Fault handling**: rethrow, log and emit flags
/// - **Diagnostics**: what happens to events nobody listens to
/// - **Executors**: sizing of the built-in delivery contexts
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct BusConfig {
    /// Deliver an event to subscribers of its ancestor and capability types.
    ///
    /// When `false`, only subscribers of the exact concrete type receive it and
    /// sticky replay matches the exact type only.
    pub event_inheritance: bool,

    /// Return handler faults to the poster instead of containing them.
    pub rethrow_on_fault: bool,

    /// Log contained handler faults at `error` level.
    pub log_on_fault: bool,

    /// Post a `SubscriberFaultEvent` for contained handler faults.
    pub emit_fault_event: bool,

    /// Post a `NoSubscriberEvent` when an event reaches nobody.
    pub emit_no_subscriber_event: bool,

    /// Log events that reach nobody at `debug` level.
    pub log_no_subscriber: bool,

    /// Maximum number of queued affinity deliveries run per job handed to the
    /// affinity executor. Remaining deliveries are resubmitted behind the context's
    /// other work.
    pub affinity_batch: usize,

    /// Upper bound of concurrently running `Concurrent` handlers in the built-in pool.
    ///
    /// - `0` = tokio default
    /// - `n > 0` = at most `n` handlers run simultaneously
    pub worker_threads: usize,
}

impl BusConfig {
    /// Returns the affinity batch clamped to a minimum of 1.
    #[inline]
    pub fn affinity_batch_clamped(&self) -> usize {
        self.affinity_batch.max(1)
    }

    /// Returns the pool limit as an `Option`.
    ///
    /// - `None` → tokio default
    /// - `Some(n)` → at most `n` concurrent handlers
    #[inline]
    pub fn worker_limit(&self) -> Option<usize> {
        if self.worker_threads == 0 {
            None
        } else {
            Some(self.worker_threads)
        }
    }
}

impl Default for BusConfig {
    /// Default configuration:
    ///
    /// - `event_inheritance = true`
    /// - `rethrow_on_fault = false`
    /// - `log_on_fault = true`, `emit_fault_event = true`
    /// - `emit_no_subscriber_event = true`, `log_no_subscriber = true`
    /// - `affinity_batch = 10`
    /// - `worker_threads = 0` (tokio default)
    fn default() -> Self {
        Self {
            event_inheritance: true,
            rethrow_on_fault: false,
            log_on_fault: true,
            emit_fault_event: true,
            emit_no_subscriber_event: true,
            log_no_subscriber: true,
            affinity_batch: DEFAULT_AFFINITY_BATCH,
            worker_threads: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_normalised() {
        let cfg = BusConfig {
            affinity_batch: 0,
            ..BusConfig::default()
        };
        assert_eq!(cfg.affinity_batch_clamped(), 1);
        assert_eq!(cfg.worker_limit(), None);

        let cfg = BusConfig {
            worker_threads: 4,
            ..BusConfig::default()
        };
        assert_eq!(cfg.worker_limit(), Some(4));
    }
}
