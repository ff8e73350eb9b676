//! Topological Scheduler
//!
//! The scheduler keeps the dependency graph of a sequential schedule and the
//! linear execution order derived from it.
//!
//! # Algorithm
//!
//! Every node records the tasks that depend on it. Tasks without
//! prerequisites hang off a synthetic `Root` node. The order is recomputed
//! from scratch after every change:
//!
//! 1. Visit the root's dependents in registration order.
//! 2. For each unvisited node, descend into its dependents first.
//! 3. Once all dependents are placed, prepend the node to the output.
//!
//! The result lists every task before everything that (transitively)
//! depends on it. Independent tasks come out in reverse registration order,
//! which is observable and kept stable.

use std::collections::HashMap;

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::trace;

use super::node::{Node, TaskId, VisitState};
use crate::error::GraphError;

/// Prerequisite and dependent lists are usually short.
pub type TaskList = SmallVec<[TaskId; 4]>;

/// Maintains a DAG of tasks and a valid execution order for it.
#[derive(Debug, Clone)]
pub struct TopoScheduler {
    /// Dependents of every node, including the root. Edges point from a
    /// prerequisite toward the tasks waiting on it.
    dependents: IndexMap<Node, TaskList>,

    /// Prerequisites of every task, as registered.
    prerequisites: IndexMap<TaskId, TaskList>,

    /// Cached execution order.
    order: Vec<TaskId>,
}

impl TopoScheduler {
    /// Create a new scheduler holding only the root.
    pub fn new() -> Self {
        let mut dependents = IndexMap::new();
        dependents.insert(Node::Root, TaskList::new());
        Self {
            dependents,
            prerequisites: IndexMap::new(),
            order: Vec::new(),
        }
    }

    /// Add a task with the given prerequisites and recompute the order.
    ///
    /// Every prerequisite must already be in the graph. Nothing is recorded
    /// if validation fails. Repeated prerequisites are collapsed.
    pub fn insert(&mut self, task: TaskId, prerequisites: &[TaskId]) -> Result<(), GraphError> {
        if self.contains(task) {
            return Err(GraphError::DuplicateNode(task));
        }
        if let Some(missing) = prerequisites.iter().find(|p| !self.contains(**p)) {
            return Err(GraphError::UnknownNode(*missing));
        }

        let mut unique = TaskList::new();
        for &prerequisite in prerequisites {
            if !unique.contains(&prerequisite) {
                unique.push(prerequisite);
            }
        }

        if unique.is_empty() {
            self.dependents_mut(Node::Root).push(task);
        } else {
            for &prerequisite in &unique {
                self.dependents_mut(Node::Task(prerequisite)).push(task);
            }
        }
        self.dependents.insert(Node::Task(task), TaskList::new());
        self.prerequisites.insert(task, unique);

        self.order = self.sort()?;
        trace!(%task, order_len = self.order.len(), "task inserted");
        Ok(())
    }

    /// Add an extra edge: `dependent` will run after `prerequisite`.
    ///
    /// The edge is rejected, and the graph left as it was, if it would close
    /// a cycle.
    pub fn add_edge(&mut self, prerequisite: TaskId, dependent: TaskId) -> Result<(), GraphError> {
        for id in [prerequisite, dependent] {
            if !self.contains(id) {
                return Err(GraphError::UnknownNode(id));
            }
        }
        if self
            .prerequisites
            .get(&dependent)
            .is_some_and(|list| list.contains(&prerequisite))
        {
            return Ok(());
        }

        self.dependents_mut(Node::Task(prerequisite)).push(dependent);
        match self.sort() {
            Ok(order) => {
                self.order = order;
                if let Some(list) = self.prerequisites.get_mut(&dependent) {
                    list.push(prerequisite);
                }
                Ok(())
            }
            Err(err) => {
                self.dependents_mut(Node::Task(prerequisite)).pop();
                Err(err)
            }
        }
    }

    /// The current execution order.
    pub fn order(&self) -> &[TaskId] {
        &self.order
    }

    /// Check whether a task is part of the graph.
    pub fn contains(&self, task: TaskId) -> bool {
        self.prerequisites.contains_key(&task)
    }

    /// The prerequisites a task was registered with.
    pub fn prerequisites(&self, task: TaskId) -> Option<&[TaskId]> {
        self.prerequisites.get(&task).map(|list| list.as_slice())
    }

    /// The tasks that directly depend on `node`.
    pub fn dependents(&self, node: Node) -> &[TaskId] {
        self.dependents
            .get(&node)
            .map(|list| list.as_slice())
            .unwrap_or_default()
    }

    /// Get the number of tasks in the graph.
    pub fn len(&self) -> usize {
        self.prerequisites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prerequisites.is_empty()
    }

    fn dependents_mut(&mut self, node: Node) -> &mut TaskList {
        self.dependents.entry(node).or_default()
    }

    /// Depth-first post-order from the root, reversed.
    fn sort(&self) -> Result<Vec<TaskId>, GraphError> {
        let mut states = HashMap::with_capacity(self.len());
        let mut placed = Vec::with_capacity(self.len());
        let mut stack = Vec::new();

        for &task in self.dependents(Node::Root) {
            self.visit(task, &mut states, &mut placed, &mut stack)?;
        }

        // Post-order pushes; prepending is the same as reversing at the end.
        placed.reverse();
        Ok(placed)
    }

    /// Walks everything reachable from `start` with an explicit stack, so
    /// chain length is bounded by memory and not by the thread's stack.
    /// Each frame holds a task and the index of its next dependent.
    fn visit(
        &self,
        start: TaskId,
        states: &mut HashMap<TaskId, VisitState>,
        placed: &mut Vec<TaskId>,
        stack: &mut Vec<(TaskId, usize)>,
    ) -> Result<(), GraphError> {
        match states.get(&start) {
            Some(VisitState::Done) => return Ok(()),
            Some(VisitState::Visiting) => return Err(GraphError::Cycle(start)),
            None => {}
        }

        states.insert(start, VisitState::Visiting);
        stack.push((start, 0));

        while let Some(frame) = stack.last_mut() {
            let (task, next) = *frame;
            match self.dependents(Node::Task(task)).get(next) {
                Some(&dependent) => {
                    frame.1 += 1;
                    match states.get(&dependent) {
                        Some(VisitState::Done) => {}
                        Some(VisitState::Visiting) => {
                            stack.clear();
                            return Err(GraphError::Cycle(dependent));
                        }
                        None => {
                            states.insert(dependent, VisitState::Visiting);
                            stack.push((dependent, 0));
                        }
                    }
                }
                None => {
                    stack.pop();
                    states.insert(task, VisitState::Done);
                    placed.push(task);
                }
            }
        }
        Ok(())
    }
}

impl Default for TopoScheduler {
    fn default() -> Self {
        Self::new()
    }
}
