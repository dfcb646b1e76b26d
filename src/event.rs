//! Minimal publish/subscribe notifier.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Handler registered with a [`Notifier`].
pub type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Identifier returned by [`Notifier::on`], used to remove the handler again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Synchronous event with handlers fired in registration order.
///
/// The handler list is snapshotted before firing, so handlers may add or remove
/// handlers (including themselves) while a trigger is in progress; such changes apply to
/// the next trigger.
///
/// # Examples
///
/// ```
/// use ferrous_tree_di::Notifier;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let event = Notifier::<u32>::new();
/// let total = Arc::new(AtomicUsize::new(0));
///
/// let id = event.on({
///     let total = total.clone();
///     move |n: &u32| { total.fetch_add(*n as usize, Ordering::SeqCst); }
/// });
/// event.trigger(&5);
/// event.off(id);
/// event.trigger(&5);
///
/// assert_eq!(total.load(Ordering::SeqCst), 5);
/// ```
pub struct Notifier<T = ()> {
    handlers: Mutex<Vec<(HandlerId, Handler<T>)>>,
    next_id: AtomicU64,
}

impl<T> Notifier<T> {
    /// Creates a notifier without handlers.
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Adds a handler.
    pub fn on<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().push((id, Arc::new(handler)));
        id
    }

    /// Removes a handler. Returns whether it was registered.
    pub fn off(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    /// Fires every handler registered at the time of the call.
    pub fn trigger(&self, data: &T) {
        let snapshot: Vec<Handler<T>> = self
            .handlers
            .lock()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in snapshot {
            handler(data);
        }
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.lock().is_empty()
    }
}

impl<T> Default for Notifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Notifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier").field("handlers", &self.len()).finish()
    }
}
