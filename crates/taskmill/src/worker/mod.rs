//! Workers drive a scheduler's tasks under a WAIT/WORK/TERMINATE state
//! machine.
//!
//! Both variants share one state-machine core: the synchronous worker
//! borrows the thread that starts it, the threaded worker owns a dedicated
//! thread. A [`DelayedStart`] defers the start of a single worker;
//! [`WorkerPool`] manages a fleet of threaded workers.

mod delay;
mod pool;
#[allow(clippy::module_inception)]
mod worker;

pub use delay::DelayedStart;
pub use pool::WorkerPool;
pub use worker::{Worker, WorkerId, WorkerState};

use crate::scheduler::Scheduler;
use std::sync::Arc;

/// Build a synchronous worker on the calling thread.
///
/// Without a delay the worker starts immediately, which runs its whole
/// loop here and returns once it terminates. With a delay, the loop runs
/// on whichever thread later triggers the start.
pub fn sync(scheduler: Arc<dyn Scheduler>, delay: Option<&DelayedStart>) -> Worker {
    Worker::with_kind(scheduler, worker::WorkerKind::Sync, delay)
}

/// Build a worker that owns a dedicated thread.
///
/// Starts immediately unless handed to a [`DelayedStart`]. The front-end's
/// drop joins the thread.
pub fn threaded(scheduler: Arc<dyn Scheduler>, delay: Option<&DelayedStart>) -> Worker {
    Worker::with_kind(scheduler, worker::WorkerKind::Threaded, delay)
}
