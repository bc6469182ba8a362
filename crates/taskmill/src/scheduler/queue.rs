//! FIFO task queue scheduler.
//!
//! The queue front-end admits tasks while open; workers drain it through
//! the [`Scheduler`] pull protocol. The backing state is shared-owned so a
//! dropped front-end never strands workers mid-task: they finish what they
//! hold, the queue closes, and completion latches once the last task
//! returns.

use crate::future::FutureResult;
use crate::scheduler::Scheduler;
use crate::task::Task;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::sync::Arc;

/// Queue state guarded by the scheduler mutex.
///
/// Invariant: `completed ⇔ !open ∧ queue empty ∧ working == 0`, and
/// `completed` is latched once set.
struct QueueState {
    /// Pending tasks in submission order.
    queue: VecDeque<Task>,

    /// Whether new tasks are admitted.
    open: bool,

    /// Workers currently executing a task popped from this queue.
    working: usize,

    /// Latched terminal state.
    completed: bool,
}

/// Shared scheduler backing a [`TaskQueue`].
pub(crate) struct QueueScheduler {
    state: Mutex<QueueState>,

    /// Signalled when work arrives or waiting predicates must re-check.
    work_available: Condvar,

    /// Signalled when the completion latch sets.
    completion: Condvar,
}

impl QueueScheduler {
    fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                open: true,
                working: 0,
                completed: false,
            }),
            work_available: Condvar::new(),
            completion: Condvar::new(),
        }
    }

    /// Admit a task if the queue is open; drop it otherwise. Dropping
    /// cancels the task's future, so a rejected submitter still observes
    /// an outcome.
    fn add_task(&self, task: Task) {
        let mut state = self.state.lock();
        if state.open {
            state.queue.push_back(task);
            drop(state);
            self.work_available.notify_one();
        } else {
            drop(state);
            tracing::debug!("task submitted to a closed queue; cancelling");
            drop(task);
        }
    }

    /// Stop admitting tasks. Idempotent.
    fn close(&self) {
        let mut state = self.state.lock();
        state.open = false;
        self.check_completed(&mut state);
    }

    /// Drop every pending task; each drop publishes `Cancelled`. Leaves
    /// `open` unchanged.
    fn cancel(&self) {
        let drained: Vec<Task> = {
            let mut state = self.state.lock();
            let drained = state.queue.drain(..).collect();
            self.check_completed(&mut state);
            drained
        };
        if !drained.is_empty() {
            tracing::debug!(pending = drained.len(), "queue cancelled");
        }
        // Cancel the futures outside the lock, then let parked workers
        // re-check their predicates.
        drop(drained);
        self.work_available.notify_all();
    }

    fn is_closed(&self) -> bool {
        !self.state.lock().open
    }

    /// Latch completion when the queue is closed, drained, and idle. Wakes
    /// completion waiters and predicate-blocked workers on the transition.
    fn check_completed(&self, state: &mut QueueState) {
        if !state.completed && !state.open && state.queue.is_empty() && state.working == 0 {
            state.completed = true;
            tracing::debug!("queue completed");
            self.completion.notify_all();
            self.work_available.notify_all();
        }
    }
}

impl Scheduler for QueueScheduler {
    fn start_scheduled_work(&self, predicate: &dyn Fn(bool) -> bool) {
        let mut state = self.state.lock();
        loop {
            let work_available = !state.queue.is_empty();
            if state.completed || !predicate(work_available) {
                return;
            }
            if work_available {
                state.working += 1;
                let task = match state.queue.pop_front() {
                    Some(task) => task,
                    None => unreachable!("work reported available on an empty queue"),
                };
                // Run the task with the scheduler lock released.
                MutexGuard::unlocked(&mut state, || task.launch());
                state.working -= 1;
                self.check_completed(&mut state);
            } else {
                self.work_available.wait(&mut state);
            }
        }
    }

    fn check_waiting_predicates(&self) {
        self.work_available.notify_all();
    }

    fn is_completed(&self) -> bool {
        self.state.lock().completed
    }

    fn wait(&self) {
        let mut state = self.state.lock();
        while !state.completed {
            self.completion.wait(&mut state);
        }
    }
}

/// FIFO work queue with an open → closed → completed lifecycle.
///
/// Tasks begin execution in submission order; they may complete out of
/// order when several workers drain the queue concurrently. Dropping the
/// front-end closes the queue.
pub struct TaskQueue {
    scheduler: Arc<QueueScheduler>,
}

impl TaskQueue {
    /// Create an open, empty queue.
    pub fn new() -> Self {
        Self {
            scheduler: Arc::new(QueueScheduler::new()),
        }
    }

    /// The scheduler handle workers pull from.
    pub fn scheduler(&self) -> Arc<dyn Scheduler> {
        self.scheduler.clone()
    }

    /// Package a callable and submit it, returning the typed handle to its
    /// outcome.
    ///
    /// If the queue is closed the task is dropped and the returned future
    /// observes `Cancelled`.
    pub fn spawn<F, R>(&self, func: F) -> FutureResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        let (task, future) = Task::create(func);
        self.scheduler.add_task(task);
        future
    }

    /// Submit a pre-built task. The submitter already holds its future.
    pub fn spawn_task(&self, task: Task) {
        self.scheduler.add_task(task);
    }

    /// Stop admitting tasks. Idempotent; already-queued tasks still run.
    pub fn close(&self) {
        self.scheduler.close();
    }

    /// Drop every pending task, publishing `Cancelled` on each of their
    /// futures. Tasks already executing run to their natural outcome; the
    /// queue stays open unless separately closed.
    pub fn cancel(&self) {
        self.scheduler.cancel();
    }

    /// Whether the queue has stopped admitting tasks.
    pub fn is_closed(&self) -> bool {
        self.scheduler.is_closed()
    }

    /// Whether the queue has latched completion.
    pub fn is_completed(&self) -> bool {
        self.scheduler.is_completed()
    }

    /// Block until the queue latches completion.
    pub fn wait(&self) {
        self.scheduler.wait();
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.scheduler.close();
    }
}
