//! # Built-in affinity context.
//!
//! [`AffinityLoop`] owns a dedicated thread that plays the role of the host's main
//! context when the host does not provide one. Jobs run in submission order, so work
//! submitted through [`Executor::execute`] interleaves with the bus's delivery batches.

use std::io;
use std::thread::{self, ThreadId};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{AffinityExecutor, Executor, Job, run_job, spawn_context_thread};

/// Dedicated affinity thread with a FIFO job queue.
pub struct AffinityLoop {
    tx: mpsc::UnboundedSender<Job>,
    thread: ThreadId,
    token: CancellationToken,
}

impl AffinityLoop {
    /// Starts the loop thread.
    pub fn spawn() -> io::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let token = CancellationToken::new();

        let handle = spawn_context_thread("postbus-affinity", token.clone(), move |token| async move {
            loop {
                let job = tokio::select! {
                    _ = token.cancelled() => break,
                    job = rx.recv() => match job {
                        Some(job) => job,
                        None => break,
                    },
                };
                run_job("affinity", job);
            }
            debug!("affinity loop stopped");
        })?;

        Ok(Self {
            tx,
            thread: handle.thread().id(),
            token,
        })
    }

    /// Stops the loop; jobs still queued are dropped.
    pub fn shutdown(&self) {
        self.token.cancel();
    }
}

impl Executor for AffinityLoop {
    fn execute(&self, job: Job) {
        if self.tx.send(job).is_err() {
            warn!("affinity loop is stopped; job dropped");
        }
    }
}

impl AffinityExecutor for AffinityLoop {
    fn is_current(&self) -> bool {
        thread::current().id() == self.thread
    }
}
