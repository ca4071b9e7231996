//! # Thread-mode router - where each delivery runs.
//!
//! ```text
//! mode         poster on affinity context     poster elsewhere
//! Direct       inline                         inline
//! Affinity     inline                         affinity queue ─► AffinityExecutor
//! Sequential   SequentialWorker (FIFO, 1)     inline
//! Concurrent   WorkerPool                     WorkerPool
//! ```
//!
//! ## Affinity batches
//! Queued affinity deliveries wait in a bus-side FIFO. The executor holds at most one
//! drain job for it at a time:
//! ```text
//! queue idle ─► push ─► submit drain job
//! drain job: deliver up to `affinity_batch` entries
//!            entries left? ─► submit itself again (behind the host's other work)
//!            queue empty?  ─► mark idle
//! ```
//!
//! Every path ends in [`invoke`], which checks the subscription's active flag right
//! before calling the handler, so a subscriber unregistered while a delivery was
//! queued is never called.

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, trace};

use super::bus::BusCore;
use crate::error::{BusError, HandlerFault, panic_message};
use crate::events::{AnyEvent, SubscriberFaultEvent};
use crate::executors::{AffinityExecutor, Executor};
use crate::policies::FaultAction;
use crate::subscribers::{Subscription, ThreadMode};

/// The three delivery contexts besides the poster's own.
pub(crate) struct Router {
    affinity: Arc<dyn AffinityExecutor>,
    sequential: Arc<dyn Executor>,
    pool: Arc<dyn Executor>,
    affinity_queue: Mutex<AffinityQueue>,
    affinity_batch: usize,
}

/// Affinity deliveries waiting for the affinity context.
#[derive(Default)]
struct AffinityQueue {
    deliveries: VecDeque<(Arc<Subscription>, Arc<dyn AnyEvent>)>,
    /// A drain job is submitted and has not finished yet.
    scheduled: bool,
}

impl Router {
    pub(crate) fn new(
        affinity: Arc<dyn AffinityExecutor>,
        sequential: Arc<dyn Executor>,
        pool: Arc<dyn Executor>,
        affinity_batch: usize,
    ) -> Self {
        Self {
            affinity,
            sequential,
            pool,
            affinity_queue: Mutex::new(AffinityQueue::default()),
            affinity_batch: affinity_batch.max(1),
        }
    }

    /// Whether the calling thread is the affinity context.
    pub(crate) fn is_affinity(&self) -> bool {
        self.affinity.is_current()
    }

    /// Delivers `event` to `sub` according to its thread mode.
    ///
    /// Only inline deliveries can return a rethrown fault.
    pub(crate) fn route(
        &self,
        core: &Arc<BusCore>,
        sub: &Arc<Subscription>,
        event: &Arc<dyn AnyEvent>,
        on_affinity: bool,
    ) -> Result<(), BusError> {
        match sub.thread_mode() {
            ThreadMode::Direct => invoke(core, sub, event),
            ThreadMode::Affinity if on_affinity => invoke(core, sub, event),
            ThreadMode::Affinity => {
                self.enqueue_affinity(core, sub, event);
                Ok(())
            }
            ThreadMode::Sequential if on_affinity => {
                enqueue(self.sequential.as_ref(), core, sub, event);
                Ok(())
            }
            ThreadMode::Sequential => invoke(core, sub, event),
            ThreadMode::Concurrent => {
                enqueue(self.pool.as_ref(), core, sub, event);
                Ok(())
            }
        }
    }

    fn enqueue_affinity(
        &self,
        core: &Arc<BusCore>,
        sub: &Arc<Subscription>,
        event: &Arc<dyn AnyEvent>,
    ) {
        let submit = {
            let mut queue = self.affinity_queue.lock();
            queue.deliveries.push_back((Arc::clone(sub), Arc::clone(event)));
            !std::mem::replace(&mut queue.scheduled, true)
        };
        if submit {
            self.submit_affinity_drain(core);
        }
    }

    fn submit_affinity_drain(&self, core: &Arc<BusCore>) {
        let core = Arc::clone(core);
        self.affinity.execute(Box::new(move || drain_affinity(&core)));
    }
}

/// Runs one batch of queued affinity deliveries on the affinity context.
fn drain_affinity(core: &Arc<BusCore>) {
    let router = &core.router;
    for _ in 0..router.affinity_batch {
        let next = {
            let mut queue = router.affinity_queue.lock();
            match queue.deliveries.pop_front() {
                Some(next) => next,
                None => {
                    queue.scheduled = false;
                    return;
                }
            }
        };
        let (sub, event) = next;
        deliver_queued(core, &sub, &event);
    }

    let remaining = {
        let mut queue = router.affinity_queue.lock();
        if queue.deliveries.is_empty() {
            queue.scheduled = false;
        }
        queue.deliveries.len()
    };
    if remaining > 0 {
        trace!(
            batch = router.affinity_batch,
            remaining,
            "affinity batch exhausted; rescheduling"
        );
        router.submit_affinity_drain(core);
    }
}

fn enqueue<X: Executor + ?Sized>(
    executor: &X,
    core: &Arc<BusCore>,
    sub: &Arc<Subscription>,
    event: &Arc<dyn AnyEvent>,
) {
    let core = Arc::clone(core);
    let sub = Arc::clone(sub);
    let event = Arc::clone(event);
    executor.execute(Box::new(move || deliver_queued(&core, &sub, &event)));
}

fn deliver_queued(core: &Arc<BusCore>, sub: &Subscription, event: &Arc<dyn AnyEvent>) {
    if let Err(err) = invoke(core, sub, event) {
        error!(
            mode = sub.thread_mode().as_label(),
            label = err.as_label(),
            error = %err,
            "fault from queued delivery has no poster to rethrow to; dropped"
        );
    }
}

/// Calls the handler of `sub` if it is still active and applies the fault policy.
pub(crate) fn invoke(
    core: &Arc<BusCore>,
    sub: &Subscription,
    event: &Arc<dyn AnyEvent>,
) -> Result<(), BusError> {
    if !sub.is_active() {
        trace!(
            subscriber = sub.subscriber_name(),
            event = event.event_type().name(),
            "skipping inactive subscription"
        );
        return Ok(());
    }

    let target = sub.subscriber().target();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        sub.descriptor().invoke(target, event.as_ref())
    }));
    let fault = match outcome {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(err)) => {
            HandlerFault::returned(sub.subscriber_name(), event.event_type().name(), err)
        }
        Err(panic) => HandlerFault::panicked(
            sub.subscriber_name(),
            event.event_type().name(),
            panic_message(panic.as_ref()).into_owned(),
        ),
    };
    handle_fault(core, sub, event, fault)
}

fn handle_fault(
    core: &Arc<BusCore>,
    sub: &Subscription,
    event: &Arc<dyn AnyEvent>,
    fault: HandlerFault,
) -> Result<(), BusError> {
    let (log, emit) = match core.faults.decide(event.as_ref()) {
        FaultAction::Rethrow => return Err(fault.into()),
        FaultAction::Report { log, emit } => (log, emit),
    };

    if log {
        if let Some(diag) = event.downcast_ref::<SubscriberFaultEvent>() {
            error!(
                subscriber = sub.subscriber_name(),
                label = fault.as_label(),
                cause = %fault.cause,
                original_subscriber = diag.subscriber,
                original_event = diag.causing_event.event_type().name(),
                original_cause = %diag.fault.cause,
                "fault while handling a subscriber fault event"
            );
        } else {
            error!(
                subscriber = sub.subscriber_name(),
                event = event.event_type().name(),
                mode = sub.thread_mode().as_label(),
                label = fault.as_label(),
                cause = %fault.cause,
                "could not dispatch event"
            );
        }
    }

    if emit {
        core.post_erased(Arc::new(SubscriberFaultEvent {
            subscriber: sub.subscriber_name(),
            causing_event: Arc::clone(event),
            fault: Arc::new(fault),
        }))?;
    }
    Ok(())
}
