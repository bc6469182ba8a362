//! The scheduling contract between work sources and workers.

/// Thread-safe pull source of tasks for workers.
///
/// Shared as `Arc<dyn Scheduler>` by its front-end and every worker pulling
/// from it, so in-flight workers outlive a dropped front-end.
pub trait Scheduler: Send + Sync {
    /// Pull and run tasks on the calling thread until the predicate or the
    /// scheduler says stop.
    ///
    /// The predicate receives whether work is currently available and
    /// returns whether the caller should continue. It is evaluated under
    /// the scheduler's lock, so the decision is atomic with respect to
    /// submissions. Protocol, looped until an exit condition:
    ///
    /// 1. If the scheduler is completed, return.
    /// 2. Invoke `predicate(work_available)`; if it returns false, return.
    /// 3. If work is available: pop the front task, run it with the
    ///    scheduler lock released, then re-evaluate completion.
    /// 4. Otherwise block until work arrives, the scheduler completes, or
    ///    [`check_waiting_predicates`](Scheduler::check_waiting_predicates)
    ///    is called.
    ///
    /// The predicate must not block on locks held across calls into the
    /// scheduler; workers take only their own lock inside it and release
    /// it before returning.
    fn start_scheduled_work(&self, predicate: &dyn Fn(bool) -> bool);

    /// Wake every caller blocked in step 4 of
    /// [`start_scheduled_work`](Scheduler::start_scheduled_work) so it
    /// re-evaluates its predicate.
    ///
    /// Has no effect on workers currently inside a task. Call whenever
    /// external state a predicate may depend on changes.
    fn check_waiting_predicates(&self);

    /// Whether the scheduler has latched its terminal state. Once true, no
    /// further task will execute.
    fn is_completed(&self) -> bool;

    /// Block until the scheduler latches completion.
    fn wait(&self);
}
