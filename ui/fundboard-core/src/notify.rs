//! Process-wide toast queue.
//!
//! Toasts are kept in arrival order. Each one gets a fresh id and an expiry
//! task on the injected [`Scheduler`]; explicit removal cancels that task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::scheduler::{Scheduler, TaskHandle};
use crate::types::Severity;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(pub u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub message: String,
    pub severity: Severity,
}

#[derive(Default)]
struct ToastState {
    toasts: Vec<Toast>,
    timers: HashMap<ToastId, TaskHandle>,
}

struct ToastShared {
    state: Mutex<ToastState>,
    next_id: AtomicU64,
    revision: watch::Sender<u64>,
}

impl ToastShared {
    fn remove(&self, id: ToastId) -> Option<TaskHandle> {
        let mut st = self.state.lock();
        let before = st.toasts.len();
        st.toasts.retain(|t| t.id != id);
        let timer = st.timers.remove(&id);
        let removed = st.toasts.len() != before;
        drop(st);
        if removed {
            self.revision.send_modify(|r| *r += 1);
        }
        timer.filter(|_| removed)
    }
}

/// Cloneable handle to the shared toast queue.
#[derive(Clone)]
pub struct ToastChannel {
    shared: Arc<ToastShared>,
    scheduler: Arc<dyn Scheduler>,
    display_for: Duration,
}

impl ToastChannel {
    pub fn new(scheduler: Arc<dyn Scheduler>, display_for: Duration) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(ToastShared {
                state: Mutex::new(ToastState::default()),
                next_id: AtomicU64::new(1),
                revision,
            }),
            scheduler,
            display_for,
        }
    }

    pub fn add_toast(&self, message: impl Into<String>, severity: Severity) -> ToastId {
        let id = ToastId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let message = message.into();
        debug!(id = id.0, ?severity, %message, "toast");

        // The expiry task only holds a weak reference so a scheduler that
        // outlives the channel does not keep it alive.
        let weak: Weak<ToastShared> = Arc::downgrade(&self.shared);
        {
            // Held across scheduling so an immediate expiry cannot run
            // before the timer is recorded.
            let mut st = self.shared.state.lock();
            st.toasts.push(Toast {
                id,
                message,
                severity,
            });
            let handle = self.scheduler.schedule(
                self.display_for,
                async move {
                    if let Some(shared) = weak.upgrade() {
                        shared.remove(id);
                    }
                }
                .boxed(),
            );
            st.timers.insert(id, handle);
        }
        self.shared.revision.send_modify(|r| *r += 1);
        id
    }

    /// Removes `id` now and cancels its expiry. Returns `false` if it was
    /// not (or no longer) present.
    pub fn remove_toast(&self, id: ToastId) -> bool {
        let present = self.shared.state.lock().toasts.iter().any(|t| t.id == id);
        if let Some(timer) = self.shared.remove(id) {
            timer.cancel();
        }
        present
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.shared.state.lock().toasts.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) -> ToastId {
        self.add_toast(message, Severity::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> ToastId {
        self.add_toast(message, Severity::Error)
    }

    pub fn warning(&self, message: impl Into<String>) -> ToastId {
        self.add_toast(message, Severity::Warning)
    }
}
