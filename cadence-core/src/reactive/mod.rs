//! Reactive Primitives
//!
//! Observable cells that notify subscribers when their value changes.
//!
//! # Concepts
//!
//! ## Reactive Values
//!
//! A [`ReactiveValue`] is a mutable cell holding a current and a previous
//! value. `set` runs an optional validator, checks whether the result is a
//! change and, if so, calls every subscriber synchronously with
//! `(current, old)`.
//!
//! ## Derived Values
//!
//! A [`DerivedValue`] is computed from other cells by a derivation that
//! reads them through a [`DependencyTracker`]. Changes upstream are
//! coalesced: the derived value recomputes once per flush of its
//! [`ReactiveRuntime`], or right away when read while pending.
//!
//! ## Change Detection
//!
//! Whether a new value counts as a change is decided by [`StableEq`] unless
//! a custom check is given. [`Frozen`] marks immutable composites that
//! compare by content; shared mutable composites always count as changed.
//!
//! # Implementation Notes
//!
//! Everything here is single-threaded (`Rc`/`RefCell`). Dependency tracking
//! is explicit: the tracker is passed into the derivation rather than
//! discovered through thread-local state, so a derivation reads exactly the
//! cells it names.

mod context;
mod derived;
mod equality;
mod runtime;
mod subscriber;
mod value;

pub use context::{DependencyTracker, Trackable};
pub use derived::DerivedValue;
pub use equality::{changed, Frozen, StableEq};
pub use runtime::ReactiveRuntime;
pub use subscriber::{CellId, SubscriberId, Subscription};
pub use value::ReactiveValue;
