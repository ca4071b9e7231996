//! # Worker pool for concurrent deliveries.
//!
//! [`WorkerPool`] runs each job on tokio's blocking pool, so slow synchronous
//! handlers never block the async workers. The pool either owns a runtime or
//! borrows the host's through a [`Handle`].

use std::io;

use tokio::runtime::{Builder, Handle, Runtime};

use super::{Executor, Job, run_job};

/// Unordered, parallel executor backed by tokio's blocking pool.
pub struct WorkerPool {
    handle: Handle,
    owned: Option<Runtime>,
}

impl WorkerPool {
    /// Starts a dedicated runtime.
    ///
    /// `max_threads` caps concurrently running handlers (`None` = tokio default).
    pub fn spawn(max_threads: Option<usize>) -> io::Result<Self> {
        let mut builder = Builder::new_multi_thread();
        builder.worker_threads(1).thread_name("postbus-worker");
        if let Some(limit) = max_threads {
            builder.max_blocking_threads(limit);
        }
        let runtime = builder.build()?;
        Ok(Self {
            handle: runtime.handle().clone(),
            owned: Some(runtime),
        })
    }

    /// Uses an existing runtime owned by the host.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            owned: None,
        }
    }
}

impl Executor for WorkerPool {
    fn execute(&self, job: Job) {
        drop(self.handle.spawn_blocking(move || run_job("concurrent", job)));
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Dropping a runtime from inside async code panics; detach instead.
        if let Some(runtime) = self.owned.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier, mpsc};
    use std::time::Duration;

    #[test]
    fn jobs_run_in_parallel() {
        let pool = WorkerPool::spawn(Some(4)).unwrap();
        // Both jobs must be running at the same time to pass the barrier.
        let barrier = Arc::new(Barrier::new(2));
        let (tx, rx) = mpsc::channel();
        for _ in 0..2 {
            let barrier = barrier.clone();
            let tx = tx.clone();
            pool.execute(Box::new(move || {
                barrier.wait();
                tx.send(()).unwrap();
            }));
        }
        for _ in 0..2 {
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn borrows_host_runtime() {
        let pool = WorkerPool::from_handle(Handle::current());
        let (tx, rx) = tokio::sync::oneshot::channel();
        pool.execute(Box::new(move || {
            let _ = tx.send(7);
        }));
        assert_eq!(rx.await.unwrap(), 7);
    }
}
