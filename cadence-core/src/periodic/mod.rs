//! Periodic Runners
//!
//! Two independent recurring-invocation primitives:
//!
//! - [`spawn_interval`]: call a callback every fixed period until it returns
//!   [`ControlFlow::Break`](std::ops::ControlFlow::Break).
//! - [`RateLimiter`] / [`spawn_throttled`]: throttle an arbitrarily frequent
//!   tick source down to a target frequency.
//!
//! Both spawn onto the current [`LocalSet`](tokio::task::LocalSet).

mod interval;
mod rate_limit;

pub use interval::spawn_interval;
pub use rate_limit::{spawn_throttled, RateLimiter};
