use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::AbortHandle;

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(0);

/// Identifies one arming of a timer. A callback compares it against the timer
/// currently stored by its owner, so a timer that fired concurrently with its
/// cancellation is ignored.
pub type TimerId = u64;

/// Single-shot timer backed by a tokio task. Dropping it cancels it.
#[derive(Debug)]
pub struct Timer {
    id: TimerId,
    handle: AbortHandle,
}

impl Timer {
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce(TimerId) + Send + 'static,
    {
        let id = NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire(id);
        })
        .abort_handle();
        Self { id, handle }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
