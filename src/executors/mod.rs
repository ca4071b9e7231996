//! # Executors: where queued deliveries run.
//!
//! The router hands deferred invocations to one of three executors:
//!
//! ```text
//! ThreadMode::Affinity   ──► AffinityExecutor  (one designated context, FIFO)
//! ThreadMode::Sequential ──► SequentialWorker  (one dedicated thread, one job in flight)
//! ThreadMode::Concurrent ──► WorkerPool        (tokio blocking pool, unordered)
//! ```
//!
//! Hosts with their own main loop implement [`AffinityExecutor`] and pass it to
//! [`BusBuilder::with_affinity`](crate::BusBuilder::with_affinity); otherwise the bus
//! starts an [`AffinityLoop`].
//!
//! ## Rules
//! - A panicking job is caught and logged; the executor keeps serving.
//! - Executors stop once the bus (their only sender) is dropped.

mod affinity;
mod pool;
mod sequential;

use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, JoinHandle};

use tokio::runtime::Builder;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::error::panic_message;

pub use affinity::AffinityLoop;
pub use pool::WorkerPool;
pub use sequential::SequentialWorker;

/// A deferred invocation.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Accepts jobs and runs each one exactly once.
pub trait Executor: Send + Sync {
    /// Schedules `job`.
    fn execute(&self, job: Job);
}

/// Executor bound to the single designated affinity context (e.g. a UI thread).
///
/// Jobs must run to completion, once, on that context, in submission order.
pub trait AffinityExecutor: Executor {
    /// Returns `true` when called from the affinity context.
    fn is_current(&self) -> bool;
}

/// Runs a job, containing any panic.
pub(crate) fn run_job(executor: &'static str, job: Job) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(job)) {
        error!(
            executor,
            panic = %panic_message(panic.as_ref()),
            "job panicked"
        );
    }
}

/// Spawns a named thread driving `body` on its own current-thread tokio runtime.
pub(crate) fn spawn_context_thread<F, Fut>(
    name: &str,
    token: CancellationToken,
    body: F,
) -> io::Result<JoinHandle<()>>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = ()>,
{
    let runtime = Builder::new_current_thread().build()?;
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || runtime.block_on(body(token)))
}
