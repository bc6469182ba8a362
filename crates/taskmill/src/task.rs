//! Single-use packaged callables.
//!
//! A [`Task`] bundles a callable with the producer side of its outcome
//! slot. Whoever holds the task either launches it or lets it drop; a drop
//! before launch publishes `Cancelled` so no observer is ever stranded.

use crate::future::{AnyFutureResult, ErasedOutcome, FutureResult, OutcomeCell};
use crate::outcome::{Cancellation, TaskFailure, TaskOutcome};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancel the currently running task from inside its body.
///
/// Unwinds with the [`Cancellation`] marker; the launch handler maps the
/// unwind to a `Cancelled` outcome instead of `Failed`. Calling this
/// outside a task body behaves like any other panic.
pub fn cancel_current() -> ! {
    panic::panic_any(Cancellation);
}

/// Capability view of a packaged task with the return type erased.
trait TaskCore: Send {
    /// Run the callable and publish the outcome. Must not unwind.
    fn launch(self: Box<Self>);

    /// Publish `Cancelled` if the task has not started.
    fn cancel(&self);

    /// Type-erased handle to the task's outcome.
    fn future(&self) -> AnyFutureResult;
}

/// Concrete packaged callable for a return type `R`.
struct PackagedTask<R, F> {
    func: F,
    cell: Arc<OutcomeCell<R>>,

    /// Serializes launch against cancel: whoever flips this false→true
    /// publishes the outcome.
    started: AtomicBool,
}

impl<R, F> TaskCore for PackagedTask<R, F>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + Sync + 'static,
{
    fn launch(self: Box<Self>) {
        let this = *self;
        let already = this.started.swap(true, Ordering::AcqRel);
        debug_assert!(!already, "task has already been launched");
        if already {
            return;
        }

        let outcome = match panic::catch_unwind(AssertUnwindSafe(this.func)) {
            Ok(value) => TaskOutcome::Value(value),
            Err(payload) => match payload.downcast::<Cancellation>() {
                Ok(marker) => TaskOutcome::Cancelled(*marker),
                Err(payload) => TaskOutcome::Failed(TaskFailure::new(payload)),
            },
        };
        this.cell.publish(outcome);
    }

    fn cancel(&self) {
        if !self.started.swap(true, Ordering::AcqRel) {
            self.cell.publish(TaskOutcome::Cancelled(Cancellation));
        }
    }

    fn future(&self) -> AnyFutureResult {
        let cell: Arc<dyn ErasedOutcome> = self.cell.clone();
        AnyFutureResult::from_cell(cell)
    }
}

/// A movable, single-use package of a callable plus its outcome producer.
///
/// Created with [`Task::create`]; executed with [`launch`](Task::launch).
/// Dropping an unlaunched task cancels it, which is how a closed or
/// cancelled queue resolves the futures of work it will never run.
pub struct Task {
    core: Option<Box<dyn TaskCore>>,
}

impl Task {
    /// Package a callable, returning the task and the typed handle to its
    /// eventual outcome.
    ///
    /// Arguments are captured by the closure; the closure's return type
    /// parameterizes the future.
    pub fn create<F, R>(func: F) -> (Task, FutureResult<R>)
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        let cell = Arc::new(OutcomeCell::new());
        let future = FutureResult::new(cell.clone());
        let core = PackagedTask {
            func,
            cell,
            started: AtomicBool::new(false),
        };
        (
            Task {
                core: Some(Box::new(core)),
            },
            future,
        )
    }

    /// Execute the callable and publish the outcome.
    ///
    /// Publishes `Value` on normal return, `Cancelled` if the body unwound
    /// with the [`Cancellation`] marker, `Failed` on any other unwind. A
    /// panic never propagates to the caller.
    pub fn launch(mut self) {
        match self.core.take() {
            Some(core) => core.launch(),
            None => unreachable!("task core taken while the task was still owned"),
        }
    }

    /// Cancel the task if it has not started; otherwise a no-op.
    pub fn cancel(&self) {
        if let Some(core) = &self.core {
            core.cancel();
        }
    }

    /// Type-erased handle to this task's outcome.
    ///
    /// The typed handle was returned by [`Task::create`]; this one serves
    /// consumers holding only the erased task.
    pub fn future(&self) -> AnyFutureResult {
        match &self.core {
            Some(core) => core.future(),
            None => unreachable!("task core taken while the task was still owned"),
        }
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        // Launch consumes the core, so reaching here with one means the
        // task never ran.
        if let Some(core) = self.core.take() {
            core.cancel();
        }
    }
}
