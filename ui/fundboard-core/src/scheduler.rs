//! Deferred task execution.
//!
//! Everything that must happen "later" (post-write refreshes, toast expiry)
//! goes through a [`Scheduler`] so tests can drive time explicitly with
//! [`ManualScheduler`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::task::AbortHandle;

pub trait Scheduler: Send + Sync {
    /// Runs `task` once after `delay`, unless the returned handle is
    /// cancelled first.
    fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TaskHandle;
}

/// Cancellation handle for a scheduled task.
#[derive(Clone)]
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
    abort: Option<AbortHandle>,
}

impl TaskHandle {
    fn new(abort: Option<AbortHandle>) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            abort,
        }
    }

    /// Prevents the task from starting. A task that already started is
    /// aborted at its next await point when running on Tokio.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TokioScheduler
// ---------------------------------------------------------------------------

/// Wall-clock scheduler on the ambient Tokio runtime.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TaskHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let join = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !flag.load(Ordering::SeqCst) {
                task.await;
            }
        });
        TaskHandle {
            cancelled,
            abort: Some(join.abort_handle()),
        }
    }
}

// ---------------------------------------------------------------------------
// ManualScheduler
// ---------------------------------------------------------------------------

struct Pending {
    due: Duration,
    seq: u64,
    handle: TaskHandle,
    task: BoxFuture<'static, ()>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_seq: u64,
    pending: Vec<Pending>,
}

/// Virtual-clock scheduler; nothing runs until [`advance`](Self::advance).
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of scheduled tasks that have neither run nor been cancelled.
    pub fn pending(&self) -> usize {
        self.state
            .lock()
            .pending
            .iter()
            .filter(|p| !p.handle.is_cancelled())
            .count()
    }

    /// Moves the clock forward by `by`, running every task that falls due
    /// in (due time, scheduling order). Tasks scheduled while advancing run
    /// too if they fall inside the window.
    pub async fn advance(&self, by: Duration) {
        let target = self.state.lock().now + by;
        loop {
            let next = {
                let mut st = self.state.lock();
                let idx = st
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.due <= target)
                    .min_by_key(|(_, p)| (p.due, p.seq))
                    .map(|(i, _)| i);
                match idx {
                    Some(i) => {
                        let p = st.pending.remove(i);
                        st.now = p.due;
                        Some(p)
                    }
                    None => {
                        st.now = target;
                        None
                    }
                }
            };
            match next {
                Some(p) if !p.handle.is_cancelled() => p.task.await,
                Some(_) => {}
                None => break,
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TaskHandle {
        let handle = TaskHandle::new(None);
        let mut st = self.state.lock();
        let seq = st.next_seq;
        st.next_seq += 1;
        let due = st.now + delay;
        st.pending.push(Pending {
            due,
            seq,
            handle: handle.clone(),
            task,
        });
        handle
    }
}
