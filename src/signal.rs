use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

type Subscriber = Arc<dyn Fn() + Send + Sync>;

/// "State changed, please repaint" notification.
///
/// Hosts either subscribe a callback (e.g. `Window::request_redraw`) or poll
/// the dirty flag on their next frame. Both work at once.
#[derive(Default)]
pub struct RedrawSignal {
    subscribers: Mutex<Vec<Subscriber>>,
    dirty: AtomicBool,
    emitted: AtomicU64,
}

impl RedrawSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribers.lock().push(Arc::new(callback));
    }

    /// Callbacks run on a snapshot taken without the lock held, so they may
    /// subscribe to this signal. A callback added during an emit first runs
    /// on the next one.
    pub fn emit(&self) {
        self.dirty.store(true, Ordering::Release);
        self.emitted.fetch_add(1, Ordering::Relaxed);
        let subscribers: Vec<Subscriber> = self.subscribers.lock().clone();
        for subscriber in &subscribers {
            subscriber();
        }
    }

    /// Returns whether a redraw was requested since the last call, and clears it.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Total number of emits over the signal's lifetime.
    pub fn emit_count(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for RedrawSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedrawSignal")
            .field("subscribers", &self.subscribers.lock().len())
            .field("dirty", &self.is_dirty())
            .field("emitted", &self.emit_count())
            .finish()
    }
}
