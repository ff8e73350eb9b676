//! Sequential Schedule
//!
//! Runs every registered task once per call, one after another, in an order
//! consistent with the dependency graph.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut schedule = SequentialSchedule::<f64>::new();
//! let physics = schedule.create_task(|dt| ready(step_physics(dt)), &[])?;
//! let camera = schedule.create_task(|dt| ready(follow_camera(dt)), &[physics])?;
//!
//! schedule.start_no_yield(1.0 / 60.0)?;
//! ```

use std::future::Future;
use std::panic::Location;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use super::task::{Hooks, Task, TaskResult};
use crate::config::{ExecutionMode, ScheduleOptions};
use crate::error::ScheduleError;
use crate::graph::{TaskId, TopoScheduler};

/// A schedule that executes its tasks in topological order on the calling
/// task.
///
/// `A` is the argument pack handed to every task and hook on each run.
pub struct SequentialSchedule<A> {
    options: ScheduleOptions,
    graph: TopoScheduler,
    tasks: IndexMap<TaskId, Task<A>>,
    hooks: Hooks<A>,
}

impl<A> SequentialSchedule<A>
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
            graph: TopoScheduler::new(),
            tasks: IndexMap::new(),
            hooks: Hooks::default(),
        }
    }

    /// Register `body` as a task that runs after all of `prerequisites`.
    ///
    /// Every prerequisite must be a task of this schedule. The execution
    /// order is recomputed before returning.
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
        self.graph.insert(id, prerequisites)?;
        self.tasks.insert(id, task);

        debug!(
            schedule = %self.options.name,
            task = %id,
            prerequisites = prerequisites.len(),
            "task registered"
        );
        Ok(id)
    }

    /// Set the hook run right before each task.
    pub fn set_before(&mut self, hook: impl Fn(TaskId, &A) + 'static) {
        self.hooks.before = std::rc::Rc::new(hook);
    }

    /// Set the hook run right after each task that succeeded.
    pub fn set_after(&mut self, hook: impl Fn(TaskId, &A) + 'static) {
        self.hooks.after = std::rc::Rc::new(hook);
    }

    /// Run every task once, in order. Bodies may suspend, which suspends
    /// this call.
    ///
    /// The first failing task stops the run.
    pub async fn start(&self, args: A) -> Result<(), ScheduleError> {
        for task in self.ordered() {
            let id = task.id();
            (self.hooks.before)(id, &args);
            trace!(schedule = %self.options.name, task = %id, "task started");

            if let Err(err) = task.invoke(args.clone()).await {
                warn!(schedule = %self.options.name, task = %id, error = %err, "task failed");
                return Err(err);
            }

            (self.hooks.after)(id, &args);
            trace!(schedule = %self.options.name, task = %id, "task finished");
        }
        Ok(())
    }

    /// Run every task once, in order, requiring each body to finish without
    /// suspending.
    ///
    /// A body that fails or suspends stops the run. Its `after` hook and all
    /// later tasks are skipped.
    pub fn start_no_yield(&self, args: A) -> Result<(), ScheduleError> {
        for task in self.ordered() {
            let id = task.id();
            (self.hooks.before)(id, &args);
            trace!(schedule = %self.options.name, task = %id, "task started");

            if let Err(err) = task.invoke_no_yield(args.clone()) {
                warn!(schedule = %self.options.name, task = %id, error = %err, "task failed");
                return Err(err);
            }

            (self.hooks.after)(id, &args);
            trace!(schedule = %self.options.name, task = %id, "task finished");
        }
        Ok(())
    }

    /// Run using the configured [`ExecutionMode`].
    pub async fn run(&self, args: A) -> Result<(), ScheduleError> {
        match self.options.mode {
            ExecutionMode::Cooperative => self.start(args).await,
            ExecutionMode::NoYield => self.start_no_yield(args),
        }
    }

    /// The current execution order.
    pub fn order(&self) -> &[TaskId] {
        self.graph.order()
    }

    /// The prerequisites `task` was registered with.
    pub fn prerequisites(&self, task: TaskId) -> Option<&[TaskId]> {
        self.graph.prerequisites(task)
    }

    /// Where `task` was registered.
    pub fn location(&self, task: TaskId) -> Option<&'static Location<'static>> {
        self.tasks.get(&task).map(|t| t.location())
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

    fn ordered(&self) -> impl Iterator<Item = &Task<A>> + '_ {
        self.graph.order().iter().filter_map(|id| self.tasks.get(id))
    }
}

impl<A> Default for SequentialSchedule<A>
where
    A: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A> std::fmt::Debug for SequentialSchedule<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialSchedule")
            .field("name", &self.options.name)
            .field("order", &self.graph.order())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use futures_util::future::ready;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    fn logging_task(
        log: &Log,
        name: &'static str,
    ) -> impl Fn(u32) -> futures_util::future::Ready<TaskResult> {
        let log = log.clone();
        move |_| {
            log.borrow_mut().push(name.to_string());
            ready(Ok(()))
        }
    }

    #[test]
    fn runs_in_dependency_order_and_repeats() {
        let log: Log = Rc::default();
        let mut schedule = SequentialSchedule::new();

        let a = schedule.create_task(logging_task(&log, "A"), &[]).unwrap();
        schedule.create_task(logging_task(&log, "B"), &[a]).unwrap();

        schedule.start_no_yield(0).unwrap();
        assert_eq!(*log.borrow(), vec!["A", "B"]);

        log.borrow_mut().clear();
        schedule.start_no_yield(0).unwrap();
        assert_eq!(*log.borrow(), vec!["A", "B"]);
    }

    #[test]
    fn join_receives_arguments_after_prerequisites() {
        let log: Log = Rc::default();
        let seen = Rc::new(RefCell::new(None));
        let mut schedule = SequentialSchedule::new();

        let a = schedule.create_task(logging_task(&log, "a"), &[]).unwrap();
        let b = schedule.create_task(logging_task(&log, "b"), &[]).unwrap();
        let (log_c, seen_c) = (log.clone(), seen.clone());
        schedule
            .create_task(
                move |x: u32| {
                    log_c.borrow_mut().push("c".to_string());
                    *seen_c.borrow_mut() = Some(x);
                    ready(Ok(()))
                },
                &[a, b],
            )
            .unwrap();

        schedule.start_no_yield(7).unwrap();

        let log = log.borrow();
        assert_eq!(log.len(), 3);
        assert_eq!(log[2], "c");
        assert_eq!(*seen.borrow(), Some(7));
    }

    #[test]
    fn unknown_prerequisite_names_the_call_site() {
        let mut other = SequentialSchedule::<u32>::new();
        let foreign = other.create_task(|_| ready(Ok(())), &[]).unwrap();

        let mut schedule = SequentialSchedule::<u32>::new();
        let line = line!() + 1;
        let err = schedule.create_task(|_| ready(Ok(())), &[foreign]).unwrap_err();

        match err {
            ScheduleError::UnknownPrerequisite { prerequisite, location } => {
                assert_eq!(prerequisite, foreign);
                assert_eq!(location.file(), file!());
                assert_eq!(location.line(), line);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(schedule.is_empty());
    }

    #[test]
    fn hooks_wrap_every_task() {
        let log: Log = Rc::default();
        let mut schedule = SequentialSchedule::new();
        let a = schedule.create_task(logging_task(&log, "A"), &[]).unwrap();

        let before_log = log.clone();
        schedule.set_before(move |id, args: &u32| {
            assert_eq!(id, a);
            before_log.borrow_mut().push(format!("before {args}"));
        });
        let after_log = log.clone();
        schedule.set_after(move |_, args| after_log.borrow_mut().push(format!("after {args}")));

        schedule.start_no_yield(3).unwrap();
        assert_eq!(*log.borrow(), vec!["before 3", "A", "after 3"]);
    }

    #[test]
    fn failure_stops_the_run() {
        let log: Log = Rc::default();
        let mut schedule = SequentialSchedule::new();

        let a = schedule
            .create_task(|_: u32| ready(Err::<(), BoxError>("broken".into())), &[])
            .unwrap();
        schedule.create_task(logging_task(&log, "B"), &[a]).unwrap();

        let after_log = log.clone();
        schedule.set_after(move |_, _| after_log.borrow_mut().push("after".to_string()));

        let err = schedule.start_no_yield(0).unwrap_err();
        assert_eq!(err.task(), Some(a));
        assert!(err.to_string().ends_with("failed: broken"));
        assert!(log.borrow().is_empty());
    }

    #[tokio::test]
    async fn no_yield_rejects_suspending_task() {
        let log: Log = Rc::default();
        let mut schedule = SequentialSchedule::new();

        let sleeper_log = log.clone();
        let sleeper = schedule
            .create_task(
                move |_: u32| {
                    let log = sleeper_log.clone();
                    async move {
                        log.borrow_mut().push("sleeper start".to_string());
                        tokio::task::yield_now().await;
                        log.borrow_mut().push("sleeper end".to_string());
                        Ok(())
                    }
                },
                &[],
            )
            .unwrap();
        schedule.create_task(logging_task(&log, "next"), &[sleeper]).unwrap();
        let after_log = log.clone();
        schedule.set_after(move |_, _| after_log.borrow_mut().push("after".to_string()));

        let err = schedule.start_no_yield(0).unwrap_err();
        assert!(matches!(err, ScheduleError::TaskYielded { task, .. } if task == sleeper));
        assert_eq!(*log.borrow(), vec!["sleeper start"]);

        // The cooperative entry point lets the same task suspend.
        log.borrow_mut().clear();
        schedule.start(0).await.unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["sleeper start", "sleeper end", "after", "next", "after"]
        );
    }

    #[tokio::test]
    async fn run_follows_configured_mode() {
        let options = ScheduleOptions {
            name: "strict".to_string(),
            mode: ExecutionMode::NoYield,
        };
        let mut schedule = SequentialSchedule::<()>::with_options(options);
        schedule
            .create_task(
                |_| async {
                    tokio::task::yield_now().await;
                    Ok(())
                },
                &[],
            )
            .unwrap();

        assert_eq!(schedule.name(), "strict");
        assert!(matches!(
            schedule.run(()).await,
            Err(ScheduleError::TaskYielded { .. })
        ));
    }
}
