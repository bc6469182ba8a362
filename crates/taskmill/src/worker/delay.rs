//! Deferred worker start-up.

use crate::worker::worker::Launcher;
use parking_lot::Mutex;
use std::sync::Arc;

/// Single-slot coordinator that defers the start of at most one worker.
///
/// A worker built with a `DelayedStart` is not started by its factory; the
/// coordinator starts it on hand-off (a second worker arrives), on an
/// explicit [`start`](DelayedStart::start), or when the coordinator drops —
/// so a held worker can never be left unstarted.
///
/// Starting a synchronous worker runs its whole loop on the thread that
/// triggers the start, including a drop of the coordinator.
pub struct DelayedStart {
    slot: Mutex<Option<Arc<Launcher>>>,
}

impl DelayedStart {
    /// Create an empty coordinator.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Take custody of a not-yet-started worker, starting any previously
    /// held one first.
    pub(crate) fn accept(&self, launcher: Arc<Launcher>) {
        let mut slot = self.slot.lock();
        if let Some(previous) = slot.take() {
            previous.start();
        }
        *slot = Some(launcher);
    }

    /// Start the held worker, if any, and clear the slot. No-op on empty.
    pub fn start(&self) {
        let mut slot = self.slot.lock();
        if let Some(launcher) = slot.take() {
            launcher.start();
        }
    }

    /// Whether the coordinator currently holds a worker.
    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

impl Default for DelayedStart {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DelayedStart {
    fn drop(&mut self) {
        self.start();
    }
}
