//! Task outcomes — value, cancellation, or captured failure.
//!
//! Every launched task produces exactly one [`TaskOutcome`]. Failures are
//! captured panic payloads; cancellation is either external (the task was
//! dropped before launch) or voluntary (the body unwound with the
//! [`Cancellation`] marker).

use parking_lot::Mutex;
use std::any::Any;
use std::fmt;

/// Marker for a cancelled task.
///
/// Also serves as the in-task cancellation signal: a task body that unwinds
/// with this payload (see [`cancel_current`](crate::task::cancel_current))
/// finishes with `TaskOutcome::Cancelled` instead of `Failed`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cancellation;

/// Captured failure of a task body.
///
/// Retains the raw panic payload for owned extraction and carries a
/// human-readable message extracted on a best-effort basis. The payload
/// sits behind a lock because `dyn Any + Send` payloads cannot be shared
/// by reference across observer threads.
pub struct TaskFailure {
    message: String,
    payload: Mutex<Option<Box<dyn Any + Send + 'static>>>,
}

impl TaskFailure {
    pub(crate) fn new(payload: Box<dyn Any + Send + 'static>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown failure".to_string()
        };
        Self {
            message,
            payload: Mutex::new(Some(payload)),
        }
    }

    /// Best-effort human-readable message.
    ///
    /// String-like payloads are rendered verbatim; anything else yields the
    /// fixed string `"unknown failure"`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Take the retained panic payload.
    ///
    /// The first caller gets it; later calls (and other observers of the
    /// same outcome) see `None`.
    pub fn take_payload(&self) -> Option<Box<dyn Any + Send + 'static>> {
        self.payload.lock().take()
    }
}

impl fmt::Debug for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaskFailure").field(&self.message).finish()
    }
}

/// One-shot result of a launched task.
#[derive(Debug)]
pub enum TaskOutcome<R> {
    /// The task body returned normally.
    Value(R),
    /// The task was cancelled before launch, or cancelled itself mid-run.
    Cancelled(Cancellation),
    /// The task body failed; the payload is retained.
    Failed(TaskFailure),
}

impl<R> TaskOutcome<R> {
    /// Whether this outcome is a `Value`.
    pub fn success(&self) -> bool {
        matches!(self, TaskOutcome::Value(_))
    }

    /// The contained value, if the outcome is a `Value`.
    pub fn value(&self) -> Option<&R> {
        match self {
            TaskOutcome::Value(value) => Some(value),
            _ => None,
        }
    }

    /// The cancellation marker, if the outcome is `Cancelled`.
    pub fn cancellation(&self) -> Option<&Cancellation> {
        match self {
            TaskOutcome::Cancelled(marker) => Some(marker),
            _ => None,
        }
    }

    /// The captured failure, if the outcome is `Failed`.
    pub fn failure(&self) -> Option<&TaskFailure> {
        match self {
            TaskOutcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Message of the captured failure, if the outcome is `Failed`.
    pub fn failure_message(&self) -> Option<&str> {
        self.failure().map(TaskFailure::message)
    }

    /// Convert into a `Result`, keeping only the failure message.
    pub fn into_result(self) -> Result<R, TaskError> {
        match self {
            TaskOutcome::Value(value) => Ok(value),
            TaskOutcome::Cancelled(_) => Err(TaskError::Cancelled),
            TaskOutcome::Failed(failure) => Err(TaskError::Failed(failure.message().to_string())),
        }
    }
}

/// Error form of a non-success outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// The task never ran, or cancelled itself.
    #[error("task was cancelled")]
    Cancelled,

    /// The task body failed.
    #[error("task failed: {0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        let outcome = TaskOutcome::Value(7);
        assert!(outcome.success());
        assert_eq!(outcome.value(), Some(&7));
        assert!(outcome.cancellation().is_none());
        assert!(outcome.failure().is_none());
        assert!(outcome.failure_message().is_none());
    }

    #[test]
    fn test_cancelled_accessors() {
        let outcome: TaskOutcome<i32> = TaskOutcome::Cancelled(Cancellation);
        assert!(!outcome.success());
        assert!(outcome.value().is_none());
        assert_eq!(outcome.cancellation(), Some(&Cancellation));
        assert!(outcome.failure().is_none());
    }

    #[test]
    fn test_failure_message_from_str() {
        let failure = TaskFailure::new(Box::new("boom"));
        assert_eq!(failure.message(), "boom");
    }

    #[test]
    fn test_failure_message_from_string() {
        let failure = TaskFailure::new(Box::new(String::from("broken pipe")));
        assert_eq!(failure.message(), "broken pipe");
    }

    #[test]
    fn test_failure_message_unknown_payload() {
        let failure = TaskFailure::new(Box::new(42_u64));
        assert_eq!(failure.message(), "unknown failure");
    }

    #[test]
    fn test_take_payload_is_one_shot() {
        let failure = TaskFailure::new(Box::new(42_u64));

        let payload = failure.take_payload().unwrap();
        assert_eq!(payload.downcast_ref::<u64>(), Some(&42));
        assert!(failure.take_payload().is_none());
        // The message survives payload extraction.
        assert_eq!(failure.message(), "unknown failure");
    }

    #[test]
    fn test_into_result() {
        assert_eq!(TaskOutcome::Value(1).into_result(), Ok(1));

        let cancelled: TaskOutcome<i32> = TaskOutcome::Cancelled(Cancellation);
        assert_eq!(cancelled.into_result(), Err(TaskError::Cancelled));

        let failed: TaskOutcome<i32> = TaskOutcome::Failed(TaskFailure::new(Box::new("boom")));
        assert_eq!(
            failed.into_result(),
            Err(TaskError::Failed("boom".to_string()))
        );
    }

    #[test]
    fn test_task_error_display() {
        assert_eq!(TaskError::Cancelled.to_string(), "task was cancelled");
        assert_eq!(
            TaskError::Failed("boom".to_string()).to_string(),
            "task failed: boom"
        );
    }
}
