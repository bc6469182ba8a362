//! The worker state machine and its two start variants.
//!
//! A worker tracks two states under one lock: `current`, the observed
//! status, and `requested`, the command. Freshly built workers request
//! `Work` so they begin pulling as soon as they start. `Terminate` is
//! absorbing, and `current` reaches it exactly once, only from the run
//! loop itself.

use crate::scheduler::Scheduler;
use crate::worker::DelayedStart;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Process-unique worker identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct WorkerId(u64);

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

impl WorkerId {
    fn next() -> Self {
        WorkerId(NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The numeric ID value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Observed or requested execution state of a worker.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WorkerState {
    /// Terminal. Once current, the worker is done; once requested, the
    /// request cannot change.
    Terminate,
    /// Parked on the worker's own condition, not pulling tasks.
    Wait,
    /// Pulling tasks from the scheduler.
    Work,
}

/// Both tracked states, guarded by the worker mutex.
struct StateCell {
    current: WorkerState,
    requested: WorkerState,
}

/// State-machine core shared by the front-end, the run loop, and the
/// scheduler-invoked predicate.
pub(crate) struct WorkerCore {
    id: WorkerId,
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<StateCell>,

    /// Signalled when the worker should leave `Wait` or has terminated.
    wake: Condvar,
}

impl WorkerCore {
    fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            id: WorkerId::next(),
            scheduler,
            state: Mutex::new(StateCell {
                current: WorkerState::Wait,
                requested: WorkerState::Work,
            }),
            wake: Condvar::new(),
        }
    }

    /// Main loop. Holds the worker lock except while parked or inside the
    /// scheduler.
    fn run(&self) {
        tracing::trace!(worker = self.id.as_u64(), "worker loop entered");
        let mut state = self.state.lock();
        'main: loop {
            state.current = state.requested;

            if state.requested == WorkerState::Terminate {
                break 'main;
            }

            while state.requested == WorkerState::Wait {
                if self.scheduler.is_completed() {
                    break 'main;
                }
                self.wake.wait(&mut state);
            }

            if state.requested == WorkerState::Work {
                if self.scheduler.is_completed() {
                    break 'main;
                }
                // The scheduler calls the predicate under its own lock; the
                // worker lock must be free for that, and is only taken
                // briefly inside the predicate.
                MutexGuard::unlocked(&mut state, || {
                    self.scheduler.start_scheduled_work(&|_work_available| {
                        self.state.lock().requested == WorkerState::Work
                    });
                });
            }
        }
        state.current = WorkerState::Terminate;
        drop(state);
        self.wake.notify_all();
        tracing::trace!(worker = self.id.as_u64(), "worker terminated");
    }

    /// Request a state. No-op when the request already stands; rejected
    /// (debug assertion) when trying to leave `Terminate`.
    pub(crate) fn request_state(&self, target: WorkerState) {
        let mut notify_wait = false;
        let mut changed = false;
        {
            let mut state = self.state.lock();
            if state.requested == WorkerState::Terminate {
                debug_assert!(
                    target == WorkerState::Terminate,
                    "worker cannot leave the terminate state"
                );
                return;
            }
            if state.requested != target {
                notify_wait = state.requested == WorkerState::Wait;
                state.requested = target;
                changed = true;
            }
        }

        // Signal after releasing the lock.
        if notify_wait {
            self.wake.notify_all();
        }
        if changed {
            // A worker parked inside the scheduler re-evaluates its
            // predicate against the new request.
            self.scheduler.check_waiting_predicates();
        }
    }

    pub(crate) fn current_state(&self) -> WorkerState {
        self.state.lock().current
    }

    pub(crate) fn requested_state(&self) -> WorkerState {
        self.state.lock().requested
    }

    /// Block until the worker terminates.
    pub(crate) fn wait(&self) {
        // A WAIT-parked worker only re-checks completion when poked, so
        // wait on the scheduler first; blocking on the worker condition
        // before the scheduler completes would deadlock.
        self.scheduler.wait();
        self.wake.notify_all();

        let mut state = self.state.lock();
        while state.current != WorkerState::Terminate {
            self.wake.wait(&mut state);
        }
    }
}

/// How a worker acquires its run-loop thread.
pub(crate) enum WorkerKind {
    /// Borrow the thread that starts the worker; starting returns when the
    /// loop terminates.
    Sync,
    /// Own a dedicated thread; joined when the front-end drops.
    Threaded,
}

/// Start capability for a not-yet-started worker. Shared between the
/// front-end and an optional [`DelayedStart`] holder.
pub(crate) struct Launcher {
    kind: WorkerKind,
    core: Arc<WorkerCore>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Launcher {
    /// Run or spawn the worker, per its kind.
    pub(crate) fn start(&self) {
        match self.kind {
            WorkerKind::Sync => self.core.run(),
            WorkerKind::Threaded => {
                let core = self.core.clone();
                let handle = thread::Builder::new()
                    .name(format!("taskmill-worker-{}", self.core.id.as_u64()))
                    .spawn(move || core.run())
                    .expect("failed to spawn worker thread");
                *self.thread.lock() = Some(handle);
            }
        }
    }
}

/// Front-end of a worker consuming one scheduler.
///
/// Built through [`worker::sync`](crate::worker::sync) or
/// [`worker::threaded`](crate::worker::threaded). Dropping a threaded
/// worker joins its thread, so terminate it first (close the queue or
/// request [`WorkerState::Terminate`]) or the drop blocks.
pub struct Worker {
    launcher: Arc<Launcher>,
}

impl Worker {
    pub(crate) fn with_kind(
        scheduler: Arc<dyn Scheduler>,
        kind: WorkerKind,
        delay: Option<&DelayedStart>,
    ) -> Worker {
        let core = Arc::new(WorkerCore::new(scheduler));
        let launcher = Arc::new(Launcher {
            kind,
            core,
            thread: Mutex::new(None),
        });
        let worker = Worker {
            launcher: launcher.clone(),
        };
        match delay {
            Some(delay) => delay.accept(launcher),
            None => launcher.start(),
        }
        worker
    }

    /// This worker's process-unique ID.
    pub fn id(&self) -> WorkerId {
        self.launcher.core.id
    }

    /// Request a state transition; see [`WorkerState`] for the rules.
    pub fn request_state(&self, state: WorkerState) {
        self.launcher.core.request_state(state);
    }

    /// The observed state.
    pub fn state(&self) -> WorkerState {
        self.launcher.core.current_state()
    }

    /// The standing request.
    pub fn requested_state(&self) -> WorkerState {
        self.launcher.core.requested_state()
    }

    /// Block until the worker terminates. Returns promptly if it already
    /// has.
    pub fn wait(&self) {
        self.launcher.core.wait();
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(handle) = self.launcher.thread.lock().take() {
            handle.join().expect("failed to join worker thread");
        }
        debug_assert_eq!(
            self.launcher.core.current_state(),
            WorkerState::Terminate,
            "worker dropped before terminating"
        );
    }
}
