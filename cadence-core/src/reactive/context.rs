//! Dependency Tracking
//!
//! A derivation receives a [`DependencyTracker`] and reads its sources
//! through it. Every distinct source read during one run is subscribed to,
//! so the derivation is invalidated when any of them changes.
//!
//! The tracker is rebuilt for every run. Sources that a run no longer reads
//! are dropped along with the previous tracker's subscriptions, which keeps
//! dynamic dependencies exact.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::subscriber::{CellId, Subscription};

/// A reactive cell that a derivation can depend on.
pub trait Trackable {
    type Value;

    /// Identity used to subscribe to each source once per run.
    fn cell_id(&self) -> CellId;

    /// Current value, bringing it up to date first if needed.
    fn read(&self) -> Self::Value;

    /// Call `on_change` whenever this cell's value changes.
    fn subscribe_invalidation(&self, on_change: Rc<dyn Fn()>) -> Subscription;
}

/// Records the sources a single derivation run reads.
pub struct DependencyTracker {
    sources: RefCell<IndexMap<CellId, Subscription>>,
    on_change: Rc<dyn Fn()>,
}

impl DependencyTracker {
    pub(crate) fn new(on_change: Rc<dyn Fn()>) -> Self {
        Self {
            sources: RefCell::new(IndexMap::new()),
            on_change,
        }
    }

    /// Read `source` and depend on it.
    ///
    /// # Panics
    ///
    /// Panics if `source` is a derived value currently computing, which
    /// means the derivation graph has a cycle.
    pub fn track<S: Trackable + ?Sized>(&self, source: &S) -> S::Value {
        let id = source.cell_id();
        if !self.sources.borrow().contains_key(&id) {
            let subscription = source.subscribe_invalidation(Rc::clone(&self.on_change));
            self.sources.borrow_mut().insert(id, subscription);
        }
        source.read()
    }

    /// Number of distinct sources tracked so far.
    pub fn len(&self) -> usize {
        self.sources.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.borrow().is_empty()
    }

    pub(crate) fn into_subscriptions(self) -> Vec<Subscription> {
        self.sources.into_inner().into_values().collect()
    }
}

impl fmt::Debug for DependencyTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyTracker")
            .field("sources", &self.sources.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}
