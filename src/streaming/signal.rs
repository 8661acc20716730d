//! Cooperative cancellation
//!
//! An [`AbortController`] owns the right to cancel; the [`AbortSignal`]s it
//! hands out observe it. Cancellation is advisory: nothing running is
//! interrupted, observers just stop surfacing output.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

type Listener = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct SignalState {
    aborted: AtomicBool,
    next_id: AtomicU64,
    listeners: Mutex<HashMap<u64, Listener>>,
    notify: Notify,
}

impl SignalState {
    fn listeners(&self) -> MutexGuard<'_, HashMap<u64, Listener>> {
        // Listeners are plain closures; a poisoned map is still consistent.
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Triggers cancellation for every signal it has handed out
#[derive(Clone, Default)]
pub struct AbortController {
    state: Arc<SignalState>,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            state: Arc::clone(&self.state),
        }
    }

    /// Fires the signal; listeners run once, on the first call only
    pub fn abort(&self) {
        if self.state.aborted.swap(true, Ordering::SeqCst) {
            return;
        }
        let listeners: Vec<Listener> = self.state.listeners().drain().map(|(_, l)| l).collect();
        for listener in listeners {
            listener();
        }
        self.state.notify.notify_waiters();
    }

    pub fn is_aborted(&self) -> bool {
        self.state.aborted.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for AbortController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortController")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

/// Read side of an [`AbortController`]
#[derive(Clone)]
pub struct AbortSignal {
    state: Arc<SignalState>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        self.state.aborted.load(Ordering::SeqCst)
    }

    /// Registers a callback for the abort
    ///
    /// The listener stays registered until the returned guard is dropped. On
    /// an already aborted signal the callback runs immediately.
    #[must_use = "dropping the guard deregisters the listener"]
    pub fn add_listener<F>(&self, listener: F) -> ListenerGuard
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_aborted() {
            listener();
            return ListenerGuard {
                state: Arc::clone(&self.state),
                id: None,
            };
        }

        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);
        self.state.listeners().insert(id, Box::new(listener));

        // abort() may have drained the map between the check and the insert
        if self.is_aborted() {
            let pending = self.state.listeners().remove(&id);
            if let Some(listener) = pending {
                listener();
            }
        }

        ListenerGuard {
            state: Arc::clone(&self.state),
            id: Some(id),
        }
    }

    /// Number of currently registered listeners
    pub fn listener_count(&self) -> usize {
        self.state.listeners().len()
    }

    /// Resolves once the signal fires
    pub async fn cancelled(&self) {
        loop {
            let notified = self.state.notify.notified();
            if self.is_aborted() {
                return;
            }
            notified.await;
        }
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.is_aborted())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Deregisters its listener when dropped
pub struct ListenerGuard {
    state: Arc<SignalState>,
    id: Option<u64>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.state.listeners().remove(&id);
        }
    }
}
