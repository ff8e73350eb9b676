//! Schedules
//!
//! A schedule is a set of tasks with declared prerequisites and an entry
//! point that runs all of them once, honoring those prerequisites.
//!
//! - [`SequentialSchedule`] keeps a topologically sorted list and runs it in
//!   order on the calling task.
//! - [`ParallelSchedule`] launches every task as its own local unit and
//!   gates each body on its direct prerequisites.
//!
//! Both offer a `start_no_yield` variant that runs bodies through the
//! [`yield_detector`] and treats any suspension as an error.
//!
//! Task bodies take the schedule's argument pack `A` by value and return a
//! future resolving to [`TaskResult`]. Synchronous bodies can return
//! `futures_util::future::ready(..)`.

mod parallel;
mod sequential;
mod task;
pub mod yield_detector;

pub use parallel::ParallelSchedule;
pub use sequential::SequentialSchedule;
pub use task::TaskResult;
pub use yield_detector::{detect_yield, run_detecting, YieldOutcome};
