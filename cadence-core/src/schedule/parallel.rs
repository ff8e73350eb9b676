//! Parallel Schedule
//!
//! Launches every registered task at once and joins them. A task's body
//! starts as soon as its own prerequisites have finished; tasks with no
//! relationship interleave freely.
//!
//! # How It Works
//!
//! Each run spawns one local unit per task with `tokio::task::spawn_local`,
//! so a parallel schedule must be started from inside a
//! [`LocalSet`](tokio::task::LocalSet). Every unit owns a completion latch
//! (a `watch` channel). A unit:
//!
//! 1. Waits on the latches of its direct prerequisites.
//! 2. Runs `before`, the body, then `after`.
//! 3. Opens its own latch, which wakes every unit waiting on it, and reports
//!    its result to the caller.
//!
//! The caller returns when the last unit reports, or as soon as any unit
//! reports a failure. Units still in flight at that point are not cancelled.

use std::future::Future;
use std::panic::Location;
use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};

use super::task::{Hooks, Task, TaskResult};
use crate::config::{ExecutionMode, ScheduleOptions};
use crate::error::ScheduleError;
use crate::graph::TaskId;

/// A schedule that runs independent tasks concurrently on the local set.
pub struct ParallelSchedule<A> {
    options: ScheduleOptions,
    tasks: IndexMap<TaskId, Rc<Task<A>>>,
    hooks: Hooks<A>,
}

/// One task's share of a run.
struct TaskUnit<A> {
    task: Rc<Task<A>>,
    hooks: Hooks<A>,
    args: A,
    mode: ExecutionMode,
    prerequisites: SmallVec<[(TaskId, watch::Receiver<bool>); 4]>,
    complete: watch::Sender<bool>,
}

impl<A> ParallelSchedule<A>
where
    A: Clone + 'static,
{
    /// Create an empty schedule with default options.
    pub fn new() -> Self {
        Self::with_options(ScheduleOptions::default())
    }

    pub fn with_options(options: ScheduleOptions) -> Self {
        Self {
            options,
            tasks: IndexMap::new(),
            hooks: Hooks::default(),
        }
    }

    /// Register `body` as a task whose body waits for `prerequisites`.
    ///
    /// The list is stored as given; every entry must be a task of this
    /// schedule.
    #[track_caller]
    pub fn create_task<F, Fut>(
        &mut self,
        body: F,
        prerequisites: &[TaskId],
    ) -> Result<TaskId, ScheduleError>
    where
        F: Fn(A) -> Fut + 'static,
        Fut: Future<Output = TaskResult> + 'static,
    {
        let location = Location::caller();
        if let Some(&prerequisite) = prerequisites.iter().find(|p| !self.tasks.contains_key(*p)) {
            return Err(ScheduleError::UnknownPrerequisite {
                prerequisite,
                location,
            });
        }

        let task = Task::new(body, prerequisites.iter().copied().collect(), location);
        let id = task.id();
        self.tasks.insert(id, Rc::new(task));

        debug!(
            schedule = %self.options.name,
            task = %id,
            prerequisites = prerequisites.len(),
            "task registered"
        );
        Ok(id)
    }

    /// Set the hook run right before each task body.
    pub fn set_before(&mut self, hook: impl Fn(TaskId, &A) + 'static) {
        self.hooks.before = Rc::new(hook);
    }

    /// Set the hook run right after each task body that succeeded.
    pub fn set_after(&mut self, hook: impl Fn(TaskId, &A) + 'static) {
        self.hooks.after = Rc::new(hook);
    }

    /// Run every task once, concurrently. Bodies may suspend.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a [`LocalSet`](tokio::task::LocalSet).
    pub async fn start(&self, args: A) -> Result<(), ScheduleError> {
        self.launch(args, ExecutionMode::Cooperative).await
    }

    /// Like [`start`](Self::start), but every body must finish without
    /// suspending. Waiting on prerequisites is still allowed.
    pub async fn start_no_yield(&self, args: A) -> Result<(), ScheduleError> {
        self.launch(args, ExecutionMode::NoYield).await
    }

    /// Run using the configured [`ExecutionMode`].
    pub async fn run(&self, args: A) -> Result<(), ScheduleError> {
        self.launch(args, self.options.mode).await
    }

    /// The prerequisites `task` was registered with.
    pub fn prerequisites(&self, task: TaskId) -> Option<&[TaskId]> {
        self.tasks.get(&task).map(|t| t.prerequisites())
    }

    pub fn contains(&self, task: TaskId) -> bool {
        self.tasks.contains_key(&task)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    async fn launch(&self, args: A, mode: ExecutionMode) -> Result<(), ScheduleError> {
        let (report, mut reports) = mpsc::unbounded_channel();

        // Prerequisites are always registered earlier, so their latches
        // already exist when a dependent is set up.
        let mut latches: IndexMap<TaskId, watch::Receiver<bool>> =
            IndexMap::with_capacity(self.tasks.len());

        for task in self.tasks.values() {
            let (complete, latch) = watch::channel(false);
            let prerequisites = task
                .prerequisites()
                .iter()
                .filter_map(|id| latches.get(id).map(|latch| (*id, latch.clone())))
                .collect();
            latches.insert(task.id(), latch);

            let unit = TaskUnit {
                task: Rc::clone(task),
                hooks: self.hooks.clone(),
                args: args.clone(),
                mode,
                prerequisites,
                complete,
            };
            let report = report.clone();
            tokio::task::spawn_local(async move {
                let _ = report.send(unit.run().await);
            });
        }
        drop(report);

        let mut outstanding = self.tasks.len();
        while outstanding > 0 {
            match reports.recv().await {
                Some(Ok(())) => outstanding -= 1,
                Some(Err(err)) => {
                    warn!(schedule = %self.options.name, error = %err, "parallel task failed");
                    return Err(err);
                }
                None => return Err(ScheduleError::Abandoned { outstanding }),
            }
        }
        Ok(())
    }
}

impl<A> TaskUnit<A>
where
    A: Clone + 'static,
{
    async fn run(mut self) -> Result<(), ScheduleError> {
        let id = self.task.id();

        for (prerequisite, latch) in &mut self.prerequisites {
            if latch.wait_for(|done| *done).await.is_err() {
                return Err(ScheduleError::PrerequisiteFailed {
                    task: id,
                    location: self.task.location(),
                    prerequisite: *prerequisite,
                });
            }
        }

        (self.hooks.before)(id, &self.args);
        trace!(task = %id, "task started");
        match self.mode {
            ExecutionMode::Cooperative => self.task.invoke(self.args.clone()).await?,
            ExecutionMode::NoYield => self.task.invoke_no_yield(self.args.clone())?,
        }
        (self.hooks.after)(id, &self.args);
        trace!(task = %id, "task finished");

        self.complete.send_replace(true);
        Ok(())
    }
}

impl<A> Default for ParallelSchedule<A>
where
    A: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A> std::fmt::Debug for ParallelSchedule<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelSchedule")
            .field("name", &self.options.name)
            .field("tasks", &self.tasks.keys().collect::<Vec<_>>())
            .finish()
    }
}
