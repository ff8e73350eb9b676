//! Cadence Core
//!
//! This crate provides the execution core for frame-driven, single-threaded
//! applications. It implements:
//!
//! - Dependency-ordered task schedules (sequential and interleaved)
//! - Yield detection for code that must not suspend
//! - Periodic runners (fixed interval, rate limiting)
//! - Reactive values with deferred, coalesced derivations
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Task identity and incremental topological ordering
//! - `schedule`: Sequential and parallel schedules, yield detection
//! - `periodic`: Interval loop and signal rate limiter
//! - `reactive`: Reactive values, derived values and their runtime
//! - `config` / `error`: Options and error types shared by the above
//!
//! Everything runs on one thread. Asynchronous pieces spawn onto a
//! [`tokio::task::LocalSet`].
//!
//! # Example
//!
//! ```rust,ignore
//! use cadence_core::reactive::{ReactiveRuntime, ReactiveValue};
//!
//! let runtime = ReactiveRuntime::new();
//! let count = ReactiveValue::new(0);
//!
//! let source = count.clone();
//! let doubled = runtime.derive(move |t| t.track(&source) * 2);
//!
//! count.set(5)?;
//! count.set(6)?;
//! runtime.flush();
//! // One recompute for both sets.
//! assert_eq!(doubled.get(), (12, 0));
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod periodic;
pub mod reactive;
pub mod schedule;

pub use config::{ExecutionMode, RateLimitOptions, ScheduleOptions};
pub use error::{BoxError, ConfigError, GraphError, PeriodicError, ReactiveError, ScheduleError};
pub use graph::TaskId;
pub use reactive::{DerivedValue, ReactiveRuntime, ReactiveValue, Subscription};
pub use schedule::{ParallelSchedule, SequentialSchedule, TaskResult};
