//! Change Detection
//!
//! A reactive cell only notifies when its value actually changed. What
//! "changed" means depends on the kind of value:
//!
//! - Scalars, strings and other owned values compare by value.
//! - [`Frozen`] composites are shared and immutable, so they compare deeply
//!   (with a pointer shortcut).
//! - Shared *mutable* composites (`Rc<RefCell<T>>`, `Rc<Cell<T>>`) always
//!   count as changed. Their contents may have been mutated in place, so even
//!   setting the same reference again has to notify.
//!
//! Cells take their comparison from [`StableEq`] unless a custom
//! `check_changed` is supplied.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;
use std::time::Duration;

/// Equality used for change detection.
///
/// `a.stable_eq(&b)` returning `true` means replacing `a` by `b` is not a
/// change and subscribers are not notified.
pub trait StableEq {
    fn stable_eq(&self, other: &Self) -> bool;
}

macro_rules! impl_stable_eq_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl StableEq for $ty {
                #[inline]
                fn stable_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

impl_stable_eq_by_value!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    &'static str,
    Duration,
);

impl<T: StableEq> StableEq for Option<T> {
    fn stable_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.stable_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: StableEq> StableEq for Vec<T> {
    fn stable_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.stable_eq(b))
    }
}

impl<T: StableEq + ?Sized> StableEq for Box<T> {
    fn stable_eq(&self, other: &Self) -> bool {
        (**self).stable_eq(&**other)
    }
}

impl<A: StableEq, B: StableEq> StableEq for (A, B) {
    fn stable_eq(&self, other: &Self) -> bool {
        self.0.stable_eq(&other.0) && self.1.stable_eq(&other.1)
    }
}

impl<A: StableEq, B: StableEq, C: StableEq> StableEq for (A, B, C) {
    fn stable_eq(&self, other: &Self) -> bool {
        self.0.stable_eq(&other.0) && self.1.stable_eq(&other.1) && self.2.stable_eq(&other.2)
    }
}

impl<T: ?Sized> StableEq for Rc<RefCell<T>> {
    fn stable_eq(&self, _other: &Self) -> bool {
        false
    }
}

impl<T> StableEq for Rc<Cell<T>> {
    fn stable_eq(&self, _other: &Self) -> bool {
        false
    }
}

/// An immutable, cheaply clonable composite value.
///
/// Two `Frozen` values are equal when they point at the same allocation or
/// their contents compare equal.
pub struct Frozen<T: ?Sized>(Rc<T>);

impl<T> Frozen<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(value))
    }
}

impl<T: ?Sized> Frozen<T> {
    /// Whether both handles share one allocation.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.0, &other.0)
    }
}

impl<T: ?Sized> Clone for Frozen<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: ?Sized> Deref for Frozen<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> From<T> for Frozen<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: ?Sized + PartialEq> PartialEq for Frozen<T> {
    fn eq(&self, other: &Self) -> bool {
        Frozen::ptr_eq(self, other) || *self.0 == *other.0
    }
}

impl<T: ?Sized + PartialEq> StableEq for Frozen<T> {
    fn stable_eq(&self, other: &Self) -> bool {
        self == other
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Frozen<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Frozen").field(&&*self.0).finish()
    }
}

/// The default `check_changed`: a change is anything [`StableEq`] does not
/// consider equal.
pub fn changed<T: StableEq>(new: &T, current: &T) -> bool {
    !new.stable_eq(current)
}
