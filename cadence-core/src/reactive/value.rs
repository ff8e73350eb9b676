//! Reactive Value
//!
//! A `ReactiveValue` holds a current and a previous value and notifies its
//! subscribers whenever `set` actually changes it.
//!
//! # How Setting Works
//!
//! 1. `check_value(new, current, old)` may rewrite the incoming value
//!    (clamping, normalizing, rejecting by returning `current`).
//!
//! 2. `check_changed(candidate, current)` decides whether this is a change.
//!    If not, nothing happens.
//!
//! 3. Otherwise the old value becomes `current`, `current` becomes the
//!    candidate, and every subscriber is called with `(current, old)`.
//!
//! Subscribers run synchronously inside `set`. Calling `set` on the same
//! value from a subscriber is rejected with [`ReactiveError::ReentrantSet`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use super::context::Trackable;
use super::equality::{self, StableEq};
use super::subscriber::{CellId, Notifier, Subscription};
use crate::error::ReactiveError;

pub(crate) type CheckChanged<T> = Box<dyn Fn(&T, &T) -> bool>;
type CheckValue<T> = Box<dyn Fn(T, &T, &T) -> T>;

/// Current and previous value of a cell.
pub(crate) struct CellState<T> {
    pub(crate) current: T,
    pub(crate) old: T,
}

impl<T: Clone> CellState<T> {
    pub(crate) fn new(initial: T) -> Self {
        Self {
            old: initial.clone(),
            current: initial,
        }
    }

    /// Shift `next` in and return clones of `(current, old)`.
    pub(crate) fn advance(&mut self, next: T) -> (T, T) {
        self.old = std::mem::replace(&mut self.current, next);
        (self.current.clone(), self.old.clone())
    }

    pub(crate) fn pair(&self) -> (T, T) {
        (self.current.clone(), self.old.clone())
    }
}

/// Resets a flag when dropped.
pub(crate) struct FlagGuard<'a>(pub(crate) &'a Cell<bool>);

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

struct ValueInner<T> {
    id: CellId,
    state: RefCell<CellState<T>>,
    check_value: Option<CheckValue<T>>,
    check_changed: CheckChanged<T>,
    notifier: Notifier<T>,
    setting: Cell<bool>,
    destroyed: Cell<bool>,
}

/// A mutable reactive cell.
///
/// Cloning yields another handle to the same cell.
pub struct ReactiveValue<T> {
    inner: Rc<ValueInner<T>>,
}

impl<T: Clone + 'static> ReactiveValue<T> {
    /// Create a value using [`StableEq`] for change detection.
    pub fn new(initial: T) -> Self
    where
        T: StableEq,
    {
        Self::build(initial, None, Box::new(equality::changed::<T>))
    }

    /// Create a value whose incoming values pass through
    /// `check_value(new, current, old)` first.
    pub fn with_validator(initial: T, check_value: impl Fn(T, &T, &T) -> T + 'static) -> Self
    where
        T: StableEq,
    {
        Self::build(
            initial,
            Some(Box::new(check_value)),
            Box::new(equality::changed::<T>),
        )
    }

    /// Create a value with both checks supplied. `check_changed(new, current)`
    /// returns `true` when `new` counts as a change.
    pub fn with_checks(
        initial: T,
        check_value: impl Fn(T, &T, &T) -> T + 'static,
        check_changed: impl Fn(&T, &T) -> bool + 'static,
    ) -> Self {
        Self::build(initial, Some(Box::new(check_value)), Box::new(check_changed))
    }

    fn build(
        initial: T,
        check_value: Option<CheckValue<T>>,
        check_changed: CheckChanged<T>,
    ) -> Self {
        Self {
            inner: Rc::new(ValueInner {
                id: CellId::new(),
                state: RefCell::new(CellState::new(initial)),
                check_value,
                check_changed,
                notifier: Notifier::new(),
                setting: Cell::new(false),
                destroyed: Cell::new(false),
            }),
        }
    }

    pub fn id(&self) -> CellId {
        self.inner.id
    }

    /// Store `value` and notify subscribers if it is a change.
    ///
    /// Returns the value current after the call, which is the candidate
    /// produced by `check_value` or the unchanged current value.
    pub fn set(&self, value: T) -> Result<T, ReactiveError> {
        let inner = &self.inner;
        if inner.destroyed.get() {
            return Err(ReactiveError::Destroyed);
        }
        if inner.setting.replace(true) {
            return Err(ReactiveError::ReentrantSet);
        }
        let _guard = FlagGuard(&inner.setting);

        let candidate = match &inner.check_value {
            Some(check_value) => {
                let state = inner.state.borrow();
                check_value(value, &state.current, &state.old)
            }
            None => value,
        };

        let is_change = (inner.check_changed)(&candidate, &inner.state.borrow().current);
        if !is_change {
            trace!(cell = %inner.id, "set without change");
            return Ok(self.current());
        }

        let (current, old) = inner.state.borrow_mut().advance(candidate);
        trace!(cell = %inner.id, subscribers = inner.notifier.len(), "value changed");
        inner.notifier.notify(&current, &old);
        Ok(current)
    }

    /// Set the value computed from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> Result<T, ReactiveError> {
        let next = f(&self.current());
        self.set(next)
    }

    /// `(current, old)`.
    pub fn get(&self) -> (T, T) {
        self.inner.state.borrow().pair()
    }

    pub fn current(&self) -> T {
        self.inner.state.borrow().current.clone()
    }

    pub fn old(&self) -> T {
        self.inner.state.borrow().old.clone()
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

    /// Drop every subscriber and refuse further sets. Reads keep returning
    /// the last values.
    pub fn destroy(&self) {
        if !self.inner.destroyed.replace(true) {
            trace!(cell = %self.inner.id, "value destroyed");
            self.inner.notifier.clear();
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.notifier.len()
    }
}

impl<T: Clone + 'static> Trackable for ReactiveValue<T> {
    type Value = T;

    fn cell_id(&self) -> CellId {
        self.inner.id
    }

    fn read(&self) -> T {
        self.current()
    }

    fn subscribe_invalidation(&self, on_change: Rc<dyn Fn()>) -> Subscription {
        self.changed(move |_, _| on_change())
    }
}

impl<T> Clone for ReactiveValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReactiveValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("ReactiveValue")
            .field("id", &self.inner.id)
            .field("current", &state.current)
            .field("old", &state.old)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Frozen;

    #[test]
    fn set_shifts_current_into_old() {
        let value = ReactiveValue::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let _sub = value.changed(move |new, old| seen_clone.borrow_mut().push((*new, *old)));

        assert_eq!(value.set(0).unwrap(), 0);
        assert!(seen.borrow().is_empty());

        assert_eq!(value.set(1).unwrap(), 1);
        assert_eq!(*seen.borrow(), vec![(1, 0)]);
        assert_eq!(value.get(), (1, 0));
    }

    #[test]
    fn observe_fires_immediately() {
        let value = ReactiveValue::new("idle");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();

        let _sub = value.observe(move |new, old| seen_clone.borrow_mut().push((*new, *old)));
        value.set("busy").unwrap();

        assert_eq!(*seen.borrow(), vec![("idle", "idle"), ("busy", "idle")]);
    }

    #[test]
    fn validator_rewrites_incoming_values() {
        let value = ReactiveValue::with_validator(5, |new, _current, _old| new.clamp(0, 10));

        assert_eq!(value.set(42).unwrap(), 10);
        assert_eq!(value.get(), (10, 5));
        // Clamped to the current value, so no change.
        assert_eq!(value.set(11).unwrap(), 10);
        assert_eq!(value.old(), 5);
    }

    #[test]
    fn custom_check_changed() {
        let value = ReactiveValue::with_checks(
            1.0_f64,
            |new, _, _| new,
            |new, current| (new - current).abs() > 0.5,
        );

        value.set(1.2).unwrap();
        assert_eq!(value.current(), 1.0);
        value.set(2.0).unwrap();
        assert_eq!(value.get(), (2.0, 1.0));
    }

    #[test]
    fn frozen_composites_only_change_by_content() {
        let value = ReactiveValue::new(Frozen::new(vec![1, 2]));
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let _sub = value.changed(move |_, _| calls_clone.set(calls_clone.get() + 1));

        value.set(Frozen::new(vec![1, 2])).unwrap();
        assert_eq!(calls.get(), 0);
        value.set(Frozen::new(vec![3])).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn shared_mutable_composites_always_notify() {
        let list = Rc::new(RefCell::new(vec![1]));
        let value = ReactiveValue::new(list.clone());
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let _sub = value.changed(move |_, _| calls_clone.set(calls_clone.get() + 1));

        list.borrow_mut().push(2);
        value.set(list.clone()).unwrap();
        value.set(list).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn reentrant_set_is_rejected() {
        let value = ReactiveValue::new(0);
        let result = Rc::new(RefCell::new(None));

        let handle = value.clone();
        let result_clone = result.clone();
        let _sub = value.changed(move |new, _| {
            *result_clone.borrow_mut() = Some(handle.set(new + 1));
        });

        value.set(1).unwrap();
        assert_eq!(*result.borrow(), Some(Err(ReactiveError::ReentrantSet)));
        assert_eq!(value.current(), 1);

        // The guard is released once the outer set returns.
        value.set(2).unwrap();
        assert_eq!(value.current(), 2);
    }

    #[test]
    fn set_from_inside_the_validator_is_rejected() {
        let slot: Rc<RefCell<Option<ReactiveValue<i32>>>> = Rc::default();
        let nested = Rc::new(Cell::new(None));

        let (slot_clone, nested_clone) = (slot.clone(), nested.clone());
        let value = ReactiveValue::with_validator(0, move |new, _, _| {
            if let Some(me) = slot_clone.borrow().as_ref() {
                nested_clone.set(Some(me.set(99)));
            }
            new
        });
        *slot.borrow_mut() = Some(value.clone());

        assert_eq!(value.set(5), Ok(5));
        assert_eq!(nested.get(), Some(Err(ReactiveError::ReentrantSet)));
        assert_eq!(value.get(), (5, 0));
    }

    #[test]
    fn set_from_inside_the_change_check_is_rejected() {
        let slot: Rc<RefCell<Option<ReactiveValue<i32>>>> = Rc::default();
        let nested = Rc::new(Cell::new(None));

        let (slot_clone, nested_clone) = (slot.clone(), nested.clone());
        let value = ReactiveValue::with_checks(
            0,
            |new, _, _| new,
            move |new, current| {
                if let Some(me) = slot_clone.borrow().as_ref() {
                    nested_clone.set(Some(me.set(-1)));
                }
                new != current
            },
        );
        *slot.borrow_mut() = Some(value.clone());

        assert_eq!(value.set(7), Ok(7));
        assert_eq!(nested.get(), Some(Err(ReactiveError::ReentrantSet)));
        assert_eq!(value.get(), (7, 0));

        // Not stuck: a later top-level set still works.
        assert_eq!(value.set(8), Ok(8));
    }

    #[test]
    fn update_uses_current_value() {
        let value = ReactiveValue::new(10);
        value.update(|n| n * 2).unwrap();
        assert_eq!(value.get(), (20, 10));
    }

    #[test]
    fn destroy_releases_subscribers() {
        let value = ReactiveValue::new(0);
        let _sub = value.changed(|_, _| {});
        assert_eq!(value.subscriber_count(), 1);

        value.destroy();
        assert_eq!(value.subscriber_count(), 0);
        assert_eq!(value.set(3), Err(ReactiveError::Destroyed));
        assert_eq!(value.current(), 0);
    }
}
