//! Dependency Graph
//!
//! This module implements the task dependency graph behind sequential
//! schedules.
//!
//! # Overview
//!
//! The dependency graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes are registered tasks, plus one synthetic `Root` node
//! - Edges point from a prerequisite to the tasks that depend on it
//! - Tasks registered without prerequisites hang off `Root`
//!
//! Edges are only ever added. After each addition the execution order is
//! recomputed in full by a depth-first post-order walk from `Root`.
//!
//! # Design Decisions
//!
//! 1. Task identity is an explicit `TaskId` rather than closure identity,
//!    so ids can be compared, hashed and printed.
//!
//! 2. Cycles are detected during the walk and reported as
//!    [`GraphError::Cycle`](crate::error::GraphError::Cycle). Registration
//!    only accepts existing prerequisites, so cycles can only be attempted
//!    through [`TopoScheduler::add_edge`].

mod node;
mod scheduler;

pub use node::{Node, TaskId};
pub use scheduler::{TaskList, TopoScheduler};
