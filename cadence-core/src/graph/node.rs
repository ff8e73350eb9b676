//! Graph Nodes
//!
//! This module defines the identifiers and node kinds that live in the
//! dependency graph.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a registered task.
///
/// Ids come from a process-wide counter, so a task id from one schedule is
/// never mistaken for a task of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Generate a new unique task ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// A node in the dependency graph.
///
/// `Root` is the synthetic node every task without prerequisites hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    Root,
    Task(TaskId),
}

impl Node {
    /// The task behind this node, `None` for the root.
    pub fn task(&self) -> Option<TaskId> {
        match self {
            Node::Root => None,
            Node::Task(id) => Some(*id),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Node::Root)
    }
}

impl From<TaskId> for Node {
    fn from(id: TaskId) -> Self {
        Node::Task(id)
    }
}

/// Visit state used by the depth-first sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VisitState {
    /// On the current DFS path.
    Visiting,

    /// Finished and already placed in the output.
    Done,
}
