//! Fixed-size pool of threaded workers draining one scheduler.

use crate::scheduler::Scheduler;
use crate::worker::{self, Worker, WorkerState};
use std::sync::Arc;

/// A set of threaded workers pulling from the same scheduler.
///
/// Convenience over building workers one by one: broadcast state requests
/// and a single [`wait`](WorkerPool::wait) for the whole pool.
pub struct WorkerPool {
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// Spawn `count` threaded workers on the scheduler. A count of 0 means
    /// one worker per CPU core.
    pub fn new(scheduler: Arc<dyn Scheduler>, count: usize) -> Self {
        let count = if count == 0 { num_cpus::get() } else { count };
        let workers = (0..count)
            .map(|_| worker::threaded(scheduler.clone(), None))
            .collect();
        Self { workers }
    }

    /// Number of workers in the pool.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Whether the pool holds no workers.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// The workers, for per-worker inspection.
    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    /// Request a state on every worker.
    pub fn request_state(&self, state: WorkerState) {
        for worker in &self.workers {
            worker.request_state(state);
        }
    }

    /// Block until every worker terminates.
    ///
    /// Like [`Worker::wait`], this first waits for the scheduler to
    /// complete, so close the queue (or request termination) beforehand.
    pub fn wait(&self) {
        for worker in &self.workers {
            worker.wait();
        }
    }
}
