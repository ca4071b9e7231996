//! # Sequential worker: one dedicated thread, one job at a time.
//!
//! Every [`ThreadMode::Sequential`](crate::ThreadMode::Sequential) delivery handed off
//! from the affinity context is queued here, so at most one such handler runs at any
//! moment and they run in hand-off order.

use std::io;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{Executor, Job, run_job, spawn_context_thread};

/// Single-worker FIFO executor.
pub struct SequentialWorker {
    tx: mpsc::UnboundedSender<Job>,
    token: CancellationToken,
}

impl SequentialWorker {
    /// Starts the worker thread.
    pub fn spawn() -> io::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let token = CancellationToken::new();

        spawn_context_thread("postbus-sequential", token.clone(), move |token| async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    job = rx.recv() => match job {
                        Some(job) => run_job("sequential", job),
                        None => break,
                    },
                }
            }
            debug!("sequential worker stopped");
        })?;

        Ok(Self { tx, token })
    }

    /// Stops the worker; jobs still queued are dropped.
    pub fn shutdown(&self) {
        self.token.cancel();
    }
}

impl Executor for SequentialWorker {
    fn execute(&self, job: Job) {
        if self.tx.send(job).is_err() {
            warn!("sequential worker is stopped; job dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, mpsc as std_mpsc};
    use std::time::Duration;

    #[test]
    fn never_runs_two_jobs_at_once() {
        let worker = SequentialWorker::spawn().unwrap();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = std_mpsc::channel();

        for i in 0..20 {
            let in_flight = in_flight.clone();
            let max_seen = max_seen.clone();
            let tx = tx.clone();
            worker.execute(Box::new(move || {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(1));
                in_flight.fetch_sub(1, Ordering::SeqCst);
                tx.send(i).unwrap();
            }));
        }

        let order: Vec<i32> = (0..20)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(order, (0..20).collect::<Vec<_>>());
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
