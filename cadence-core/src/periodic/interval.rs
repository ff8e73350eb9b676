//! Interval Loop
//!
//! Calls a callback every `period` until the callback asks to stop.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

/// Spawn a local unit that sleeps `period`, then calls `callback(&args)`,
/// forever or until the callback returns [`ControlFlow::Break`].
///
/// The returned handle completes once the loop stops.
///
/// # Panics
///
/// Panics if called outside of a [`LocalSet`](tokio::task::LocalSet).
pub fn spawn_interval<A, F>(period: Duration, args: A, mut callback: F) -> JoinHandle<()>
where
    A: 'static,
    F: FnMut(&A) -> ControlFlow<()> + 'static,
{
    tokio::task::spawn_local(async move {
        let mut calls = 0u64;
        loop {
            tokio::time::sleep(period).await;
            calls += 1;
            if callback(&args).is_break() {
                trace!(calls, "interval loop stopped");
                break;
            }
        }
    })
}
