//! Signal Rate Limiter
//!
//! Throttles a high-frequency tick source (e.g. one tick per frame) down to
//! a target frequency.
//!
//! When a tick fires, the limiter does not reset its reference point to the
//! tick time. It keeps the part of the elapsed time that overshot the period
//! (`last = now - delta % period`), so irregular ticks average out and the
//! effective rate converges on the target.

use std::ops::ControlFlow;
use std::pin::pin;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

use crate::config::RateLimitOptions;
use crate::error::PeriodicError;

/// Decides, tick by tick, whether a throttled callback is due.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    period: Duration,
    last: Instant,
}

impl RateLimiter {
    /// Create a limiter firing at most `frequency_hz` times per second,
    /// counting from `start`.
    pub fn new(frequency_hz: f64, start: Instant) -> Result<Self, PeriodicError> {
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            return Err(PeriodicError::InvalidFrequency(frequency_hz));
        }
        // Frequencies this small give a period no Duration can hold.
        let period = Duration::try_from_secs_f64(1.0 / frequency_hz)
            .map_err(|_| PeriodicError::InvalidFrequency(frequency_hz))?;
        if period.is_zero() {
            return Err(PeriodicError::InvalidFrequency(frequency_hz));
        }
        Ok(Self { period, last: start })
    }

    pub fn from_options(options: RateLimitOptions, start: Instant) -> Result<Self, PeriodicError> {
        Self::new(options.frequency_hz, start)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Handle a tick at `now`.
    ///
    /// Returns the time elapsed since the previous firing point when the
    /// callback is due, `None` when the tick should be skipped.
    pub fn check(&mut self, now: Instant) -> Option<Duration> {
        let delta = now.saturating_duration_since(self.last);
        if delta < self.period {
            return None;
        }

        let remainder = delta.as_nanos() % self.period.as_nanos();
        // The remainder is below the period, which itself fits in a Duration.
        self.last = now - Duration::from_nanos(remainder as u64);
        Some(delta)
    }
}

/// Spawn a local unit that feeds `ticks` through `limiter` and calls
/// `callback` with the elapsed time whenever it is due.
///
/// Stops when the tick stream ends or the callback returns
/// [`ControlFlow::Break`].
///
/// # Panics
///
/// Panics if called outside of a [`LocalSet`](tokio::task::LocalSet).
pub fn spawn_throttled<S, F>(ticks: S, mut limiter: RateLimiter, mut callback: F) -> JoinHandle<()>
where
    S: Stream<Item = Instant> + 'static,
    F: FnMut(Duration) -> ControlFlow<()> + 'static,
{
    tokio::task::spawn_local(async move {
        let mut ticks = pin!(ticks);
        while let Some(now) = ticks.next().await {
            if let Some(delta) = limiter.check(now) {
                if callback(delta).is_break() {
                    trace!("throttled callback stopped");
                    break;
                }
            }
        }
    })
}
