use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Boxed listener callback.
pub type Callback<T> = Box<dyn Fn(&T) + Send + Sync + 'static>;

struct Entry<T> {
    callback: Option<Callback<T>>,
}

impl<T> Entry<T> {
    /// Returns false for an empty callback.
    fn invoke(&self, value: &T) -> bool {
        let Some(callback) = &self.callback else {
            return false;
        };
        if catch_unwind(AssertUnwindSafe(|| callback(value))).is_err() {
            tracing::warn!("listener callback panicked; continuing delivery");
        }
        true
    }
}

/// Subscription handle returned by [`ListenerRegistry::subscribe`].
///
/// The subscription stays live while at least one clone of the handle
/// exists. Dropping the last clone ends it; there is no unregister call.
pub struct Listener<T> {
    entry: Arc<Entry<T>>,
}

impl<T> Listener<T> {
    /// Invoke the callback directly, bypassing the registry.
    pub fn notify(&self, value: &T) {
        self.entry.invoke(value);
    }

    /// Returns true if this subscription has no callback.
    pub fn is_noop(&self) -> bool {
        self.entry.callback.is_none()
    }
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Self {
            entry: Arc::clone(&self.entry),
        }
    }
}

impl<T> fmt::Debug for Listener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("noop", &self.is_noop())
            .field("handles", &Arc::strong_count(&self.entry))
            .finish()
    }
}

/// Thread-safe set of callbacks notified with values of type `T`.
///
/// The registry keeps only weak references, so a subscription never keeps
/// itself alive. Clones share the same subscriber set.
pub struct ListenerRegistry<T> {
    entries: Arc<Mutex<Vec<Weak<Entry<T>>>>>,
}

impl<T> ListenerRegistry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register a callback.
    pub fn subscribe<F>(&self, callback: F) -> Listener<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_optional(Some(Box::new(callback)))
    }

    /// Register a possibly empty callback. An empty one is never invoked.
    pub fn subscribe_optional(&self, callback: Option<Callback<T>>) -> Listener<T> {
        let entry = Arc::new(Entry { callback });
        let mut entries = self.lock();
        entries.retain(|weak| weak.strong_count() > 0);
        entries.push(Arc::downgrade(&entry));
        tracing::debug!(listeners = entries.len(), "listener subscribed");
        Listener { entry }
    }

    /// Invoke every live callback with `value` on the calling thread, in
    /// subscription order. Returns the number of callbacks invoked.
    ///
    /// The subscriber set is copied before delivery, so callbacks may
    /// subscribe or drop handles. A panicking callback is logged and skipped.
    pub fn broadcast(&self, value: &T) -> usize {
        self.snapshot()
            .iter()
            .filter(|entry| entry.invoke(value))
            .count()
    }

    /// Number of live subscriptions, including empty ones.
    pub fn len(&self) -> usize {
        let mut entries = self.lock();
        entries.retain(|weak| weak.strong_count() > 0);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<Entry<T>>> {
        let mut entries = self.lock();
        let mut live = Vec::with_capacity(entries.len());
        entries.retain(|weak| match weak.upgrade() {
            Some(entry) => {
                live.push(entry);
                true
            }
            None => false,
        });
        live
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Weak<Entry<T>>>> {
        // Callbacks never run under this lock; a poisoned list is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Clone for ListenerRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ListenerRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}
