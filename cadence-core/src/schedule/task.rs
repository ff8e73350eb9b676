//! Tasks and Hooks
//!
//! A task is a registered callback plus the bookkeeping schedules need to
//! run and diagnose it.

use std::fmt;
use std::future::Future;
use std::panic::Location;
use std::rc::Rc;

use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;

use super::yield_detector::{detect_yield, YieldOutcome};
use crate::error::{BoxError, ScheduleError};
use crate::graph::{TaskId, TaskList};

/// Result of a task body.
pub type TaskResult = Result<(), BoxError>;

type TaskBody<A> = Box<dyn Fn(A) -> LocalBoxFuture<'static, TaskResult>>;
type Hook<A> = Rc<dyn Fn(TaskId, &A)>;

/// A registered unit of work. Immutable once created.
pub(crate) struct Task<A> {
    id: TaskId,
    body: TaskBody<A>,
    prerequisites: TaskList,
    location: &'static Location<'static>,
}

impl<A: 'static> Task<A> {
    pub(crate) fn new<F, Fut>(
        body: F,
        prerequisites: TaskList,
        location: &'static Location<'static>,
    ) -> Self
    where
        F: Fn(A) -> Fut + 'static,
        Fut: Future<Output = TaskResult> + 'static,
    {
        Self {
            id: TaskId::new(),
            body: Box::new(move |args| body(args).boxed_local()),
            prerequisites,
            location,
        }
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn prerequisites(&self) -> &[TaskId] {
        &self.prerequisites
    }

    pub(crate) fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Run the body, allowing it to suspend.
    pub(crate) async fn invoke(&self, args: A) -> Result<(), ScheduleError> {
        (self.body)(args).await.map_err(|source| self.failed(source))
    }

    /// Run the body under the yield detector.
    pub(crate) fn invoke_no_yield(&self, args: A) -> Result<(), ScheduleError> {
        match detect_yield((self.body)(args)) {
            YieldOutcome::Completed => Ok(()),
            YieldOutcome::Failed(source) => Err(self.failed(source)),
            YieldOutcome::Yielded => Err(ScheduleError::TaskYielded {
                task: self.id,
                location: self.location,
            }),
        }
    }

    fn failed(&self, source: BoxError) -> ScheduleError {
        ScheduleError::TaskFailed {
            task: self.id,
            location: self.location,
            source,
        }
    }
}

impl<A> fmt::Debug for Task<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("prerequisites", &self.prerequisites)
            .field("location", &format_args!("{}", self.location))
            .finish()
    }
}

/// Callbacks run around every task. Both are no-ops by default.
pub(crate) struct Hooks<A> {
    pub(crate) before: Hook<A>,
    pub(crate) after: Hook<A>,
}

impl<A> Default for Hooks<A> {
    fn default() -> Self {
        Self {
            before: Rc::new(|_, _| {}),
            after: Rc::new(|_, _| {}),
        }
    }
}

impl<A> Clone for Hooks<A> {
    fn clone(&self) -> Self {
        Self {
            before: Rc::clone(&self.before),
            after: Rc::clone(&self.after),
        }
    }
}
