//! Taskmill — thread-based task execution.
//!
//! A small concurrency substrate built from three interlocking pieces:
//! - **Task** (`task` module): a move-only packaged callable owning the
//!   producer side of a one-shot outcome slot. Dropping an unlaunched task
//!   cancels it.
//! - **Scheduler** (`scheduler` module): a thread-safe pull source of
//!   tasks. The concrete [`TaskQueue`] is FIFO with an
//!   open → closed → completed lifecycle.
//! - **Worker** (`worker` module): a consumer driving tasks to completion
//!   under a WAIT/WORK/TERMINATE state machine, in a borrowed-thread or
//!   owned-thread variant, with [`DelayedStart`] sequencing and a
//!   [`WorkerPool`] convenience.
//!
//! # Example
//!
//! ```
//! use taskmill::{worker, TaskQueue};
//!
//! let queue = TaskQueue::new();
//! let worker = worker::threaded(queue.scheduler(), None);
//!
//! let doubled = queue.spawn(|| 21 * 2);
//! assert_eq!(doubled.value(), Some(&42));
//!
//! queue.close();
//! worker.wait();
//! assert!(queue.is_completed());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod future;
pub mod outcome;
pub mod scheduler;
pub mod task;
pub mod worker;

pub use future::{AnyFutureResult, FutureResult};
pub use outcome::{Cancellation, TaskError, TaskFailure, TaskOutcome};
pub use scheduler::{Scheduler, TaskQueue};
pub use task::{cancel_current, Task};
pub use worker::{DelayedStart, Worker, WorkerId, WorkerPool, WorkerState};
