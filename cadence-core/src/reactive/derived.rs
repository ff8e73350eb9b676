//! Derived Value
//!
//! A `DerivedValue` is a read-only cell computed from other cells.
//!
//! # How Derived Values Work
//!
//! 1. The derivation runs once at creation. Every cell it reads through the
//!    [`DependencyTracker`] becomes a dependency.
//!
//! 2. When a dependency changes, the derived value is marked pending and one
//!    recompute job is deferred on its [`ReactiveRuntime`]. Further changes
//!    before that job runs are absorbed by the same job. Derived values that
//!    read this one are marked pending in the same step, so a whole chain
//!    goes stale at once.
//!
//! 3. Reading a pending derived value recomputes it on the spot, so reads
//!    are never stale. The deferred job then finds nothing to do.
//!
//! 4. Each recompute rebuilds the dependency set from scratch and notifies
//!    subscribers only if the result changed. An unchanged result leaves
//!    `old` where it was.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, error};

use super::context::{DependencyTracker, Trackable};
use super::runtime::ReactiveRuntime;
use super::subscriber::{CellId, Notifier, Subscription};
use super::value::{CellState, CheckChanged, FlagGuard};
use crate::error::ReactiveError;

type Derive<T> = Box<dyn Fn(&DependencyTracker) -> T>;

struct DerivedInner<T> {
    id: CellId,
    runtime: ReactiveRuntime,
    derive: Derive<T>,
    check_changed: CheckChanged<T>,
    state: RefCell<CellState<T>>,
    dependencies: RefCell<Vec<Subscription>>,
    notifier: Notifier<T>,
    /// Invalidation callbacks of derived values that read this one.
    dependents: Notifier<()>,
    pending: Cell<bool>,
    computing: Cell<bool>,
    destroyed: Cell<bool>,
    recomputes: Cell<u64>,
}

/// A read-only reactive cell computed from other cells.
///
/// Cloning yields another handle to the same cell.
pub struct DerivedValue<T> {
    inner: Rc<DerivedInner<T>>,
}

fn invalidation<T: Clone + 'static>(weak: Weak<DerivedInner<T>>) -> Rc<dyn Fn()> {
    Rc::new(move || {
        if let Some(inner) = weak.upgrade() {
            inner.invalidate();
        }
    })
}

impl<T: Clone + 'static> DerivedInner<T> {
    fn invalidate(self: &Rc<Self>) {
        if self.destroyed.get() || self.pending.replace(true) {
            return;
        }

        let weak = Rc::downgrade(self);
        self.runtime.defer(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if !inner.pending.get() {
                return;
            }
            if let Err(err) = inner.recompute() {
                error!(cell = %inner.id, %err, "deferred recompute failed");
            }
        });

        self.dependents.notify(&(), &());
    }

    /// Bring the value up to date before a read.
    fn sync(self: &Rc<Self>) -> Result<(), ReactiveError> {
        if self.computing.get() {
            return Err(ReactiveError::CircularDerivation);
        }
        if self.pending.get() {
            self.recompute()?;
        }
        Ok(())
    }

    fn recompute(self: &Rc<Self>) -> Result<(), ReactiveError> {
        if self.computing.replace(true) {
            return Err(ReactiveError::CircularDerivation);
        }
        let (next, count) = {
            let _guard = FlagGuard(&self.computing);
            self.pending.set(false);

            let tracker = DependencyTracker::new(invalidation(Rc::downgrade(self)));
            let next = (self.derive)(&tracker);
            let dependencies = tracker.into_subscriptions();
            let count = dependencies.len();
            // Old subscriptions are released only after the new ones exist.
            let previous = self.dependencies.replace(dependencies);
            drop(previous);
            (next, count)
        };
        self.recomputes.set(self.recomputes.get() + 1);

        let is_change = (self.check_changed)(&next, &self.state.borrow().current);
        if !is_change {
            debug!(cell = %self.id, dependencies = count, "recomputed without change");
            return Ok(());
        }

        let (current, old) = self.state.borrow_mut().advance(next);
        debug!(cell = %self.id, dependencies = count, "derived value changed");
        self.notifier.notify(&current, &old);
        Ok(())
    }
}

impl<T: Clone + 'static> DerivedValue<T> {
    pub(crate) fn new<F, C>(runtime: &ReactiveRuntime, derive: F, check_changed: C) -> Self
    where
        F: Fn(&DependencyTracker) -> T + 'static,
        C: Fn(&T, &T) -> bool + 'static,
    {
        let inner = Rc::new_cyclic(|weak: &Weak<DerivedInner<T>>| {
            let tracker = DependencyTracker::new(invalidation(weak.clone()));
            let initial = derive(&tracker);
            DerivedInner {
                id: CellId::new(),
                runtime: runtime.clone(),
                derive: Box::new(derive),
                check_changed: Box::new(check_changed),
                state: RefCell::new(CellState::new(initial)),
                dependencies: RefCell::new(tracker.into_subscriptions()),
                notifier: Notifier::new(),
                dependents: Notifier::new(),
                pending: Cell::new(false),
                computing: Cell::new(false),
                destroyed: Cell::new(false),
                recomputes: Cell::new(1),
            }
        });
        Self { inner }
    }

    pub fn id(&self) -> CellId {
        self.inner.id
    }

    /// `(current, old)`, recomputing first if a dependency changed.
    ///
    /// Fails with [`ReactiveError::CircularDerivation`] when called from
    /// inside this value's own derivation.
    pub fn try_get(&self) -> Result<(T, T), ReactiveError> {
        self.inner.sync()?;
        Ok(self.inner.state.borrow().pair())
    }

    pub fn try_current(&self) -> Result<T, ReactiveError> {
        self.inner.sync()?;
        Ok(self.inner.state.borrow().current.clone())
    }

    /// Like [`try_get`](Self::try_get).
    ///
    /// # Panics
    ///
    /// Panics on a circular derivation.
    pub fn get(&self) -> (T, T) {
        self.try_get().unwrap_or_else(|err| panic!("{err}"))
    }

    /// # Panics
    ///
    /// Panics on a circular derivation.
    pub fn current(&self) -> T {
        self.try_current().unwrap_or_else(|err| panic!("{err}"))
    }

    /// # Panics
    ///
    /// Panics on a circular derivation.
    pub fn old(&self) -> T {
        self.get().1
    }

    /// Call `callback(current, old)` now and on every change.
    pub fn observe(&self, callback: impl Fn(&T, &T) + 'static) -> Subscription {
        let (current, old) = self.get();
        callback(&current, &old);
        self.changed(callback)
    }

    /// Call `callback(current, old)` on every change.
    pub fn changed(&self, callback: impl Fn(&T, &T) + 'static) -> Subscription {
        if self.inner.destroyed.get() {
            return Subscription::inert();
        }
        self.inner.notifier.subscribe(callback)
    }

    /// Release dependencies and subscribers. The last value stays readable
    /// and is never recomputed again.
    pub fn destroy(&self) {
        if self.inner.destroyed.replace(true) {
            return;
        }
        self.inner.pending.set(false);
        let dependencies = self.inner.dependencies.take();
        drop(dependencies);
        self.inner.notifier.clear();
        self.inner.dependents.clear();
        debug!(cell = %self.inner.id, "derived value destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// Whether a dependency changed since the last recompute.
    pub fn is_pending(&self) -> bool {
        self.inner.pending.get()
    }

    /// Number of cells the last run read.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.borrow().len()
    }

    /// Number of times the derivation has run, including the initial run.
    pub fn recompute_count(&self) -> u64 {
        self.inner.recomputes.get()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.notifier.len()
    }
}

impl<T: Clone + 'static> Trackable for DerivedValue<T> {
    type Value = T;

    fn cell_id(&self) -> CellId {
        self.inner.id
    }

    fn read(&self) -> T {
        self.current()
    }

    /// Readers are invalidated as soon as this value goes stale, before it
    /// recomputes, so a read anywhere down the chain pulls fresh values.
    fn subscribe_invalidation(&self, on_change: Rc<dyn Fn()>) -> Subscription {
        if self.inner.destroyed.get() {
            return Subscription::inert();
        }
        self.inner.dependents.subscribe(move |_, _| on_change())
    }
}

impl<T> Clone for DerivedValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for DerivedValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("DerivedValue")
            .field("id", &self.inner.id)
            .field("current", &state.current)
            .field("old", &state.old)
            .field("pending", &self.inner.pending.get())
            .finish()
    }
}
