//! Yield Detection
//!
//! Runs a task body up to its first suspension point and reports whether it
//! got that far.
//!
//! # How It Works
//!
//! The body's future is polled exactly once with a no-op waker. If the poll
//! returns `Ready`, the body finished (successfully or not) without ever
//! suspending. If it returns `Pending`, the body suspended; the future is
//! dropped on the spot, so nothing after the suspension point ever runs and
//! nothing can resume it.

use std::future::Future;

use futures_util::FutureExt;

use crate::error::BoxError;

/// What happened when a body was run under the detector.
#[derive(Debug)]
pub enum YieldOutcome {
    /// Returned `Ok` without suspending.
    Completed,

    /// Suspended. The rest of the body was abandoned.
    Yielded,

    /// Returned `Err` before its first suspension.
    Failed(BoxError),
}

impl YieldOutcome {
    /// `true` for [`YieldOutcome::Completed`] and [`YieldOutcome::Yielded`].
    pub fn is_success(&self) -> bool {
        !matches!(self, YieldOutcome::Failed(_))
    }

    pub fn yielded(&self) -> bool {
        matches!(self, YieldOutcome::Yielded)
    }
}

/// Poll `future` once and classify the result.
pub fn detect_yield<F>(future: F) -> YieldOutcome
where
    F: Future<Output = Result<(), BoxError>>,
{
    match future.now_or_never() {
        Some(Ok(())) => YieldOutcome::Completed,
        Some(Err(err)) => YieldOutcome::Failed(err),
        None => YieldOutcome::Yielded,
    }
}

/// Build a future from `callback` and run it under [`detect_yield`].
pub fn run_detecting<C, F>(callback: C) -> YieldOutcome
where
    C: FnOnce() -> F,
    F: Future<Output = Result<(), BoxError>>,
{
    detect_yield(callback())
}
