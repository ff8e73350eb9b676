//! Subscriber types for the reactive system.
//!
//! Every cell keeps a [`Notifier`] with the callbacks registered on it.
//! Registering hands back a [`Subscription`], which removes the callback
//! again when disconnected or dropped.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

/// Unique identifier for a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a reactive cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(u64);

impl CellId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for CellId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

/// Handle to a registered change callback.
///
/// Dropping the handle disconnects the callback.
#[must_use = "dropping a Subscription disconnects it immediately"]
pub struct Subscription {
    id: SubscriberId,
    disconnect: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriberId, disconnect: impl FnOnce() + 'static) -> Self {
        Self {
            id,
            disconnect: Some(Box::new(disconnect)),
        }
    }

    /// A subscription to nothing, handed out by destroyed cells.
    pub(crate) fn inert() -> Self {
        Self {
            id: SubscriberId::new(),
            disconnect: None,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Stop receiving notifications.
    pub fn disconnect(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("connected", &self.disconnect.is_some())
            .finish()
    }
}

type Callback<T> = Rc<dyn Fn(&T, &T)>;

/// The change callbacks of one cell, in subscription order.
pub(crate) struct Notifier<T> {
    callbacks: Rc<RefCell<IndexMap<SubscriberId, Callback<T>>>>,
}

impl<T: 'static> Notifier<T> {
    pub(crate) fn new() -> Self {
        Self {
            callbacks: Rc::new(RefCell::new(IndexMap::new())),
        }
    }

    pub(crate) fn subscribe(&self, callback: impl Fn(&T, &T) + 'static) -> Subscription {
        let id = SubscriberId::new();
        self.callbacks.borrow_mut().insert(id, Rc::new(callback));

        let callbacks = Rc::downgrade(&self.callbacks);
        Subscription::new(id, move || {
            if let Some(callbacks) = callbacks.upgrade() {
                // Bind first so the callback is dropped after the borrow ends.
                let removed = callbacks.borrow_mut().shift_remove(&id);
                drop(removed);
            }
        })
    }

    /// Call every callback with `(new, old)`.
    ///
    /// Callbacks may subscribe or disconnect while this runs. A callback
    /// disconnected mid-round is skipped; one added mid-round waits for the
    /// next notification.
    pub(crate) fn notify(&self, new: &T, old: &T) {
        let snapshot: Vec<(SubscriberId, Callback<T>)> = self
            .callbacks
            .borrow()
            .iter()
            .map(|(id, callback)| (*id, Rc::clone(callback)))
            .collect();

        for (id, callback) in snapshot {
            if self.callbacks.borrow().contains_key(&id) {
                callback(new, old);
            }
        }
    }

    pub(crate) fn clear(&self) {
        let drained = std::mem::take(&mut *self.callbacks.borrow_mut());
        drop(drained);
    }

    pub(crate) fn len(&self) -> usize {
        self.callbacks.borrow().len()
    }
}
