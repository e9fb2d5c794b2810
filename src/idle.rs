//! Idle scheduling for opportunistic background work.
//!
//! "Run this callback when the system is otherwise idle, but no later than a
//! deadline." The orchestrator hands its enhancement stage to an
//! [`IdleSchedule`] instead of running it synchronously after the full stage.
//!
//! Two implementations are provided and selected at construction time:
//! [`YieldIdleScheduler`] cooperates with the executor by letting queued work
//! drain first; [`DeferredIdleScheduler`] is the fixed-delay fallback for
//! environments with no usable idle signal.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use crate::platform;

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Handle to one scheduled callback.
#[derive(Clone)]
pub struct IdleTaskHandle {
    state: Arc<AtomicU8>,
}

impl IdleTaskHandle {
    fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(PENDING)),
        }
    }

    /// Revokes the callback. A no-op if it has already run.
    pub fn cancel(&self) {
        let _ = self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Whether the callback has run.
    pub fn has_fired(&self) -> bool {
        self.state.load(Ordering::SeqCst) == FIRED
    }

    /// Claims the exclusive right to run the callback.
    fn try_fire(&self) -> bool {
        self.state
            .compare_exchange(PENDING, FIRED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// Callback type accepted by schedulers.
pub type IdleCallback = Box<dyn FnOnce() + Send + 'static>;

/// Deadline-bounded idle scheduling.
pub trait IdleSchedule: Send + Sync + 'static {
    /// Schedules `callback` to run once the executor has spare capacity, but
    /// no later than `deadline` even under continuous load.
    fn schedule(&self, deadline: Duration, callback: IdleCallback) -> IdleTaskHandle;
}

/// Cooperative approximation of a native idle signal.
///
/// The scheduler yields the executor a bounded number of times so that
/// already-queued tasks run first, then fires, no later than `deadline`
/// under continuous load.
#[derive(Debug, Clone)]
pub struct YieldIdleScheduler {
    /// How many times to yield before considering the executor idle.
    pub yields: u32,
}

impl Default for YieldIdleScheduler {
    fn default() -> Self {
        Self { yields: 16 }
    }
}

impl IdleSchedule for YieldIdleScheduler {
    fn schedule(&self, deadline: Duration, callback: IdleCallback) -> IdleTaskHandle {
        let handle = IdleTaskHandle::new();
        let task_handle = handle.clone();
        let yields = self.yields;
        platform::task::spawn(async move {
            let drain = async {
                for _ in 0..yields {
                    tokio::task::yield_now().await;
                }
            };
            tokio::select! {
                _ = drain => {}
                _ = platform::sleep(deadline) => {}
            }
            if task_handle.try_fire() {
                callback();
            }
        });
        handle
    }
}

/// Fixed-delay fallback for environments without an idle primitive.
///
/// The effective wait is `min(delay, deadline)`.
#[derive(Debug, Clone)]
pub struct DeferredIdleScheduler {
    pub delay: Duration,
}

impl Default for DeferredIdleScheduler {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1),
        }
    }
}

impl IdleSchedule for DeferredIdleScheduler {
    fn schedule(&self, deadline: Duration, callback: IdleCallback) -> IdleTaskHandle {
        let handle = IdleTaskHandle::new();
        let task_handle = handle.clone();
        let wait = self.delay.min(deadline);
        platform::task::spawn(async move {
            platform::sleep(wait).await;
            if task_handle.try_fire() {
                callback();
            }
        });
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    async fn settle() {
        platform::sleep(Duration::from_millis(30)).await;
    }

    #[tokio::test]
    async fn yield_scheduler_fires_the_callback() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let handle = YieldIdleScheduler::default().schedule(
            Duration::from_millis(100),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );
        settle().await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(handle.has_fired());
    }

    #[tokio::test]
    async fn deferred_scheduler_fires_the_callback() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        DeferredIdleScheduler {
            delay: Duration::from_millis(1),
        }
        .schedule(
            Duration::from_millis(100),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );
        settle().await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancel_before_firing_suppresses_the_callback() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let handle = DeferredIdleScheduler {
            delay: Duration::from_millis(20),
        }
        .schedule(
            Duration::from_millis(100),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );
        handle.cancel();
        settle().await;
        assert!(!fired.load(Ordering::SeqCst));
        assert!(!handle.has_fired());
    }

    #[tokio::test]
    async fn cancel_after_firing_is_a_no_op() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let handle = DeferredIdleScheduler {
            delay: Duration::from_millis(1),
        }
        .schedule(
            Duration::from_millis(100),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );
        settle().await;
        handle.cancel();
        assert!(fired.load(Ordering::SeqCst));
        assert!(handle.has_fired());
    }

    #[tokio::test]
    async fn deadline_clamps_the_deferred_delay() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        // delay far beyond the deadline: the deadline wins
        DeferredIdleScheduler {
            delay: Duration::from_secs(60),
        }
        .schedule(
            Duration::from_millis(5),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );
        settle().await;
        assert!(fired.load(Ordering::SeqCst));
    }
}
