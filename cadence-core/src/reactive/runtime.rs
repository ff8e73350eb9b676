//! Reactive Runtime
//!
//! The runtime owns the queue of deferred recomputations. Derived values
//! never recompute inside the `set` that invalidated them; they push a job
//! here instead and the job runs on a later turn.
//!
//! # How It Works
//!
//! 1. A source changes and notifies its dependents.
//!
//! 2. Each dependent derived value marks itself pending and, if it was not
//!    already pending, defers one recompute job.
//!
//! 3. [`ReactiveRuntime::flush`] (or the driver spawned by
//!    [`ReactiveRuntime::spawn_driver`]) drains the queue. Jobs pushed while
//!    draining run in the same flush.
//!
//! Several changes before a flush therefore cost a single recompute.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::trace;

use super::context::DependencyTracker;
use super::derived::DerivedValue;
use super::equality::{self, StableEq};

type Job = Box<dyn FnOnce()>;

#[derive(Default)]
struct RuntimeInner {
    queue: RefCell<VecDeque<Job>>,
    wake: Notify,
    flushing: Cell<bool>,
}

/// Deferred-work queue shared by the derived values created from it.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone, Default)]
pub struct ReactiveRuntime {
    inner: Rc<RuntimeInner>,
}

struct FlushGuard<'a>(&'a Cell<bool>);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl ReactiveRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a job for the next flush.
    pub fn defer(&self, job: impl FnOnce() + 'static) {
        self.inner.queue.borrow_mut().push_back(Box::new(job));
        self.inner.wake.notify_one();
    }

    /// Run queued jobs until the queue is empty, including jobs queued while
    /// flushing. Returns how many ran.
    ///
    /// A flush requested from inside a running job returns `0` at once; the
    /// outer flush picks up whatever was queued.
    pub fn flush(&self) -> usize {
        if self.inner.flushing.replace(true) {
            return 0;
        }
        let _guard = FlushGuard(&self.inner.flushing);

        let mut ran = 0;
        loop {
            // The borrow must end before the job runs, since jobs may defer more.
            let job = self.inner.queue.borrow_mut().pop_front();
            match job {
                Some(job) => {
                    job();
                    ran += 1;
                }
                None => break,
            }
        }

        if ran > 0 {
            trace!(jobs = ran, "reactive runtime flushed");
        }
        ran
    }

    /// Number of jobs waiting for a flush.
    pub fn pending(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    pub fn is_idle(&self) -> bool {
        self.inner.queue.borrow().is_empty()
    }

    /// Spawn a local unit that flushes whenever a job is deferred.
    ///
    /// The driver runs until aborted.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a [`LocalSet`](tokio::task::LocalSet).
    pub fn spawn_driver(&self) -> JoinHandle<()> {
        let runtime = self.clone();
        tokio::task::spawn_local(async move {
            loop {
                runtime.inner.wake.notified().await;
                runtime.flush();
            }
        })
    }

    /// Create a derived value computed by `derive`, using [`StableEq`] for
    /// change detection.
    pub fn derive<T, F>(&self, derive: F) -> DerivedValue<T>
    where
        T: StableEq + Clone + 'static,
        F: Fn(&DependencyTracker) -> T + 'static,
    {
        DerivedValue::new(self, derive, equality::changed::<T>)
    }

    /// Like [`derive`](Self::derive) with a custom `check_changed(new, current)`.
    pub fn derive_with<T, F, C>(&self, derive: F, check_changed: C) -> DerivedValue<T>
    where
        T: Clone + 'static,
        F: Fn(&DependencyTracker) -> T + 'static,
        C: Fn(&T, &T) -> bool + 'static,
    {
        DerivedValue::new(self, derive, check_changed)
    }
}

impl fmt::Debug for ReactiveRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveRuntime")
            .field("pending", &self.pending())
            .field("flushing", &self.inner.flushing.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::task::LocalSet;

    #[test]
    fn flush_runs_jobs_in_order() {
        let runtime = ReactiveRuntime::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let log = log.clone();
            runtime.defer(move || log.borrow_mut().push(i));
        }

        assert_eq!(runtime.pending(), 3);
        assert_eq!(runtime.flush(), 3);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert!(runtime.is_idle());
    }

    #[test]
    fn jobs_deferred_while_flushing_run_in_the_same_flush() {
        let runtime = ReactiveRuntime::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_runtime = runtime.clone();
        let inner_log = log.clone();
        runtime.defer(move || {
            inner_log.borrow_mut().push("outer");
            let log = inner_log.clone();
            inner_runtime.defer(move || log.borrow_mut().push("inner"));
            // Nested flush is a no-op.
            assert_eq!(inner_runtime.flush(), 0);
        });

        assert_eq!(runtime.flush(), 2);
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
    }

    #[tokio::test]
    async fn driver_flushes_on_a_later_turn() {
        LocalSet::new()
            .run_until(async {
                let runtime = ReactiveRuntime::new();
                let driver = runtime.spawn_driver();

                let ran = Rc::new(Cell::new(false));
                let ran_clone = ran.clone();
                runtime.defer(move || ran_clone.set(true));
                assert!(!ran.get());

                tokio::task::yield_now().await;
                tokio::task::yield_now().await;
                assert!(ran.get());
                assert!(runtime.is_idle());

                driver.abort();
            })
            .await;
    }
}
