use std::sync::Arc;

use tokio::runtime::Handle;

use super::bus::{BusCore, EventBus};
use super::config::BusConfig;
use super::router::Router;
use crate::error::BusError;
use crate::executors::{AffinityExecutor, AffinityLoop, Executor, SequentialWorker, WorkerPool};
use crate::policies::FaultPolicy;

/// Builder for constructing an [`EventBus`] with optional host integration.
pub struct BusBuilder {
    cfg: BusConfig,
    affinity: Option<Arc<dyn AffinityExecutor>>,
    worker_runtime: Option<Handle>,
    faults: Option<FaultPolicy>,
}

impl BusBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: BusConfig) -> Self {
        Self {
            cfg,
            affinity: None,
            worker_runtime: None,
            faults: None,
        }
    }

    /// Uses the host's affinity context (e.g. its UI loop).
    ///
    /// Without it the bus starts an [`AffinityLoop`] thread.
    pub fn with_affinity(mut self, affinity: Arc<dyn AffinityExecutor>) -> Self {
        self.affinity = Some(affinity);
        self
    }

    /// Runs `Concurrent` handlers on the blocking pool of an existing tokio runtime.
    ///
    /// Without it the bus starts its own runtime sized by `worker_threads`.
    pub fn with_worker_runtime(mut self, handle: Handle) -> Self {
        self.worker_runtime = Some(handle);
        self
    }

    /// Replaces the fault policy derived from the config's fault flags.
    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.faults = Some(policy);
        self
    }

    /// Builds the bus.
    ///
    /// This consumes the builder and starts the executors it needs:
    /// - affinity loop thread (unless one was supplied)
    /// - sequential worker thread
    /// - worker pool runtime (unless a handle was supplied)
    pub fn build(self) -> Result<EventBus, BusError> {
        let affinity: Arc<dyn AffinityExecutor> = match self.affinity {
            Some(affinity) => affinity,
            None => Arc::new(AffinityLoop::spawn()?),
        };
        let sequential: Arc<dyn Executor> = Arc::new(SequentialWorker::spawn()?);
        let pool: Arc<dyn Executor> = Arc::new(match self.worker_runtime {
            Some(handle) => WorkerPool::from_handle(handle),
            None => WorkerPool::spawn(self.cfg.worker_limit())?,
        });

        let faults = self
            .faults
            .unwrap_or_else(|| FaultPolicy::from_config(&self.cfg));
        let router = Router::new(affinity, sequential, pool, self.cfg.affinity_batch_clamped());
        Ok(EventBus::from_core(BusCore::new(self.cfg, router, faults)))
    }
}
