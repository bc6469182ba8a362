//! One-shot, read-many rendezvous between a task and its observers.
//!
//! An [`OutcomeCell`] is written exactly once by the task side and read any
//! number of times through cloneable [`FutureResult`] handles. Blocking
//! observers park on a mutex/condvar pair; the outcome itself lives in a
//! write-once slot so reads after publication are lock-free.

use crate::outcome::{Cancellation, TaskError, TaskFailure, TaskOutcome};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// Shared outcome slot. Producer side held by the task, consumer side by
/// any number of future handles.
pub(crate) struct OutcomeCell<R> {
    /// Written exactly once; a second write is a programming error.
    outcome: OnceLock<TaskOutcome<R>>,

    /// Completion flag for blocking observers.
    done: Mutex<bool>,

    /// Signalled once when the outcome is published.
    condvar: Condvar,
}

impl<R> OutcomeCell<R> {
    pub(crate) fn new() -> Self {
        Self {
            outcome: OnceLock::new(),
            done: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Publish the outcome and wake every blocked observer.
    pub(crate) fn publish(&self, outcome: TaskOutcome<R>) {
        let published = self.outcome.set(outcome).is_ok();
        debug_assert!(published, "task outcome published twice");
        if !published {
            return;
        }
        let mut done = self.done.lock();
        *done = true;
        drop(done);
        self.condvar.notify_all();
    }

    /// Block until the outcome is published.
    pub(crate) fn wait(&self) -> &TaskOutcome<R> {
        if let Some(outcome) = self.outcome.get() {
            return outcome;
        }
        let mut done = self.done.lock();
        while !*done {
            self.condvar.wait(&mut done);
        }
        drop(done);
        self.ready_outcome()
    }

    /// Block until the outcome is published or the timeout elapses.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> Option<&TaskOutcome<R>> {
        if let Some(outcome) = self.outcome.get() {
            return Some(outcome);
        }
        let deadline = Instant::now() + timeout;
        let mut done = self.done.lock();
        while !*done {
            if self.condvar.wait_until(&mut done, deadline).timed_out() {
                break;
            }
        }
        let ready = *done;
        drop(done);
        if ready {
            Some(self.ready_outcome())
        } else {
            None
        }
    }

    /// Non-blocking poll.
    pub(crate) fn try_outcome(&self) -> Option<&TaskOutcome<R>> {
        self.outcome.get()
    }

    fn ready_outcome(&self) -> &TaskOutcome<R> {
        match self.outcome.get() {
            Some(outcome) => outcome,
            None => unreachable!("completion signalled without a published outcome"),
        }
    }
}

/// Cloneable observer of a task's not-yet-available outcome.
///
/// Cloning adds an observer of the same slot; it does not duplicate the
/// outcome. All accessors that need the outcome block until it is
/// published; [`try_outcome`](FutureResult::try_outcome) polls.
pub struct FutureResult<R> {
    cell: Arc<OutcomeCell<R>>,
}

impl<R> Clone for FutureResult<R> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<R> FutureResult<R> {
    pub(crate) fn new(cell: Arc<OutcomeCell<R>>) -> Self {
        Self { cell }
    }

    /// Block until the outcome is published.
    pub fn wait(&self) {
        let _ = self.cell.wait();
    }

    /// Block until the outcome is published, then borrow it.
    pub fn outcome(&self) -> &TaskOutcome<R> {
        self.cell.wait()
    }

    /// Non-blocking poll of the outcome.
    pub fn try_outcome(&self) -> Option<&TaskOutcome<R>> {
        self.cell.try_outcome()
    }

    /// Block until the outcome is published or the timeout elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<&TaskOutcome<R>> {
        self.cell.wait_timeout(timeout)
    }

    /// Block, then report whether the outcome is a value.
    pub fn success(&self) -> bool {
        self.outcome().success()
    }

    /// Block, then borrow the contained value if the outcome is one.
    pub fn value(&self) -> Option<&R> {
        self.outcome().value()
    }

    /// Block, then borrow the cancellation marker if the task was cancelled.
    pub fn cancellation(&self) -> Option<&Cancellation> {
        self.outcome().cancellation()
    }

    /// Block, then borrow the captured failure if the task failed.
    pub fn failure(&self) -> Option<&TaskFailure> {
        self.outcome().failure()
    }

    /// Block, then extract the failure message if the task failed.
    pub fn failure_message(&self) -> Option<&str> {
        self.outcome().failure_message()
    }

    /// Block, then convert the outcome into a `Result`.
    pub fn to_result(&self) -> Result<R, TaskError>
    where
        R: Clone,
    {
        match self.outcome() {
            TaskOutcome::Value(value) => Ok(value.clone()),
            TaskOutcome::Cancelled(_) => Err(TaskError::Cancelled),
            TaskOutcome::Failed(failure) => Err(TaskError::Failed(failure.message().to_string())),
        }
    }
}

/// Capability view of an outcome slot with the value type erased.
pub(crate) trait ErasedOutcome: Send + Sync {
    fn wait(&self);
    fn success(&self) -> bool;
    fn value_any(&self) -> Option<&dyn Any>;
    fn cancellation(&self) -> Option<&Cancellation>;
    fn failure(&self) -> Option<&TaskFailure>;
}

impl<R: Any + Send + Sync> ErasedOutcome for OutcomeCell<R> {
    fn wait(&self) {
        let _ = OutcomeCell::wait(self);
    }

    fn success(&self) -> bool {
        OutcomeCell::wait(self).success()
    }

    fn value_any(&self) -> Option<&dyn Any> {
        OutcomeCell::wait(self).value().map(|value| value as &dyn Any)
    }

    fn cancellation(&self) -> Option<&Cancellation> {
        OutcomeCell::wait(self).cancellation()
    }

    fn failure(&self) -> Option<&TaskFailure> {
        OutcomeCell::wait(self).failure()
    }
}

/// Type-erased future handle.
///
/// Preserves every inspector of [`FutureResult`], with the value exposed as
/// `&dyn Any`. Unit-returning tasks expose the unit value itself, so
/// success remains distinguishable from the other variants without static
/// type information.
pub struct AnyFutureResult {
    cell: Arc<dyn ErasedOutcome>,
}

impl Clone for AnyFutureResult {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl AnyFutureResult {
    pub(crate) fn from_cell(cell: Arc<dyn ErasedOutcome>) -> Self {
        Self { cell }
    }

    /// Block until the outcome is published.
    pub fn wait(&self) {
        self.cell.wait();
    }

    /// Block, then report whether the outcome is a value.
    pub fn success(&self) -> bool {
        self.cell.success()
    }

    /// Block, then borrow the value as `&dyn Any`, if the outcome is one.
    pub fn value(&self) -> Option<&dyn Any> {
        self.cell.value_any()
    }

    /// Block, then borrow the cancellation marker if the task was cancelled.
    pub fn cancellation(&self) -> Option<&Cancellation> {
        self.cell.cancellation()
    }

    /// Block, then borrow the captured failure if the task failed.
    pub fn failure(&self) -> Option<&TaskFailure> {
        self.cell.failure()
    }

    /// Block, then extract the failure message if the task failed.
    pub fn failure_message(&self) -> Option<&str> {
        self.cell.failure().map(TaskFailure::message)
    }
}

impl<R: Any + Send + Sync> From<FutureResult<R>> for AnyFutureResult {
    fn from(future: FutureResult<R>) -> Self {
        Self { cell: future.cell }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_publish_then_wait() {
        let cell = Arc::new(OutcomeCell::new());
        cell.publish(TaskOutcome::Value(42));

        let future = FutureResult::new(cell);
        assert!(future.success());
        assert_eq!(future.value(), Some(&42));
    }

    #[test]
    fn test_wait_blocks_until_published() {
        let cell = Arc::new(OutcomeCell::new());
        let future = FutureResult::new(cell.clone());

        let observer = thread::spawn(move || *future.outcome().value().unwrap());

        // Publish from this thread; the observer unblocks and reads it.
        cell.publish(TaskOutcome::Value(7));
        assert_eq!(observer.join().unwrap(), 7);
    }

    #[test]
    fn test_try_outcome_polls() {
        let cell = Arc::new(OutcomeCell::new());
        let future = FutureResult::new(cell.clone());

        assert!(future.try_outcome().is_none());
        cell.publish(TaskOutcome::Value(1));
        assert!(future.try_outcome().is_some());
    }

    #[test]
    fn test_wait_timeout() {
        let cell: Arc<OutcomeCell<i32>> = Arc::new(OutcomeCell::new());
        let future = FutureResult::new(cell.clone());

        assert!(future.wait_timeout(Duration::from_millis(10)).is_none());

        cell.publish(TaskOutcome::Value(5));
        let outcome = future.wait_timeout(Duration::from_millis(10));
        assert_eq!(outcome.and_then(TaskOutcome::value), Some(&5));
    }

    #[test]
    fn test_clones_observe_same_slot() {
        let cell = Arc::new(OutcomeCell::new());
        let first = FutureResult::new(cell.clone());
        let second = first.clone();

        cell.publish(TaskOutcome::Value(String::from("shared")));

        assert_eq!(first.value().map(String::as_str), Some("shared"));
        assert_eq!(second.value().map(String::as_str), Some("shared"));
    }

    #[test]
    fn test_repeated_observation_is_stable() {
        let cell: Arc<OutcomeCell<i32>> = Arc::new(OutcomeCell::new());
        cell.publish(TaskOutcome::Cancelled(Cancellation));

        let future = FutureResult::new(cell);
        for _ in 0..3 {
            assert!(!future.success());
            assert!(future.cancellation().is_some());
            assert!(future.value().is_none());
        }
    }

    #[test]
    fn test_erased_value() {
        let cell = Arc::new(OutcomeCell::new());
        cell.publish(TaskOutcome::Value(42_i32));

        let erased: AnyFutureResult = FutureResult::new(cell).into();
        assert!(erased.success());
        let value = erased.value().and_then(|v| v.downcast_ref::<i32>());
        assert_eq!(value, Some(&42));
    }

    #[test]
    fn test_erased_unit_marker() {
        let cell: Arc<OutcomeCell<()>> = Arc::new(OutcomeCell::new());
        cell.publish(TaskOutcome::Value(()));

        let erased: AnyFutureResult = FutureResult::new(cell).into();
        // Unit tasks still report success through the erased view.
        assert!(erased.success());
        assert!(erased.value().is_some());
        assert!(erased.value().unwrap().downcast_ref::<()>().is_some());
    }

    #[test]
    fn test_erased_failure_inspectors() {
        let cell: Arc<OutcomeCell<i32>> = Arc::new(OutcomeCell::new());
        cell.publish(TaskOutcome::Failed(TaskFailure::new(Box::new("boom"))));

        let erased: AnyFutureResult = FutureResult::new(cell).into();
        assert!(!erased.success());
        assert!(erased.value().is_none());
        assert!(erased.cancellation().is_none());
        assert_eq!(erased.failure_message(), Some("boom"));
    }

    #[test]
    fn test_to_result() {
        let cell: Arc<OutcomeCell<i32>> = Arc::new(OutcomeCell::new());
        cell.publish(TaskOutcome::Value(3));
        assert_eq!(FutureResult::new(cell).to_result(), Ok(3));

        let cell: Arc<OutcomeCell<i32>> = Arc::new(OutcomeCell::new());
        cell.publish(TaskOutcome::Cancelled(Cancellation));
        assert_eq!(
            FutureResult::new(cell).to_result(),
            Err(TaskError::Cancelled)
        );
    }
}
