//! Error Types
//!
//! Every failure the core can report, grouped by the subsystem that raises it.
//!
//! Usage errors (unknown prerequisites, reentrant `set`, circular derivations)
//! and task failures are both surfaced immediately. Nothing in this crate
//! retries.

use std::panic::Location;

use thiserror::Error;

use crate::graph::TaskId;

/// Error type returned by task bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the dependency graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// A prerequisite refers to a task the graph has never seen.
    #[error("{0} is not a node of this graph")]
    UnknownNode(TaskId),

    #[error("{0} is already part of this graph")]
    DuplicateNode(TaskId),

    /// The topological visit came back to a node that was still being visited.
    #[error("dependency cycle detected at {0}")]
    Cycle(TaskId),
}

/// Errors raised while registering or running schedule tasks.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("prerequisite {prerequisite} passed at {location} is not a task of this schedule")]
    UnknownPrerequisite {
        prerequisite: TaskId,
        location: &'static Location<'static>,
    },

    #[error("{task} (defined at {location}) failed: {source}")]
    TaskFailed {
        task: TaskId,
        location: &'static Location<'static>,
        #[source]
        source: BoxError,
    },

    #[error("{task} (defined at {location}) yielded")]
    TaskYielded {
        task: TaskId,
        location: &'static Location<'static>,
    },

    /// A parallel task never started because one of its prerequisites failed.
    #[error("{task} (defined at {location}) skipped: prerequisite {prerequisite} did not complete")]
    PrerequisiteFailed {
        task: TaskId,
        location: &'static Location<'static>,
        prerequisite: TaskId,
    },

    /// Every parallel unit went away before all of them reported back.
    #[error("{outstanding} parallel task(s) were dropped before completing")]
    Abandoned { outstanding: usize },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl ScheduleError {
    /// The task this error is about, if any.
    pub fn task(&self) -> Option<TaskId> {
        match self {
            Self::TaskFailed { task, .. }
            | Self::TaskYielded { task, .. }
            | Self::PrerequisiteFailed { task, .. } => Some(*task),
            Self::UnknownPrerequisite { .. } | Self::Abandoned { .. } | Self::Graph(_) => None,
        }
    }

    /// Where the offending task (or the bad registration) was written.
    pub fn location(&self) -> Option<&'static Location<'static>> {
        match self {
            Self::UnknownPrerequisite { location, .. }
            | Self::TaskFailed { location, .. }
            | Self::TaskYielded { location, .. }
            | Self::PrerequisiteFailed { location, .. } => Some(*location),
            Self::Abandoned { .. } | Self::Graph(_) => None,
        }
    }
}

/// Errors raised by reactive values.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReactiveError {
    /// `set` was called on a cell whose own `set` has not returned yet.
    #[error("set called on a reactive value while it is already being set")]
    ReentrantSet,

    #[error("reactive value has been destroyed")]
    Destroyed,

    /// A derived value was asked for its value from inside its own derivation.
    #[error("circular derivation: derived value read while it is recomputing")]
    CircularDerivation,
}

/// Errors raised by periodic runners.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum PeriodicError {
    #[error("frequency must be finite and positive, got {0}")]
    InvalidFrequency(f64),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_errors_name_task_and_location() {
        let location = Location::caller();
        let task = TaskId::new();
        let err = ScheduleError::TaskYielded { task, location };

        assert_eq!(err.task(), Some(task));
        let message = err.to_string();
        assert!(message.contains(&task.to_string()));
        assert!(message.contains(location.file()));
        assert!(message.ends_with("yielded"));
    }

    #[test]
    fn task_failure_keeps_cause_as_source() {
        use std::error::Error as _;

        let err = ScheduleError::TaskFailed {
            task: TaskId::new(),
            location: Location::caller(),
            source: "boom".into(),
        };

        assert!(err.to_string().ends_with("failed: boom"));
        assert_eq!(err.source().map(|s| s.to_string()), Some("boom".to_string()));
    }

    #[test]
    fn graph_errors_convert() {
        let id = TaskId::new();
        let err: ScheduleError = GraphError::Cycle(id).into();
        assert!(matches!(err, ScheduleError::Graph(GraphError::Cycle(at)) if at == id));
    }
}
