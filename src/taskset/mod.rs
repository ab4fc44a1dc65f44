/*! An ordered container of tasks with revision-checked handles

Tasks are kept in insertion order. Order has no meaning for
schedulability; it only determines enumeration order.

Every insertion returns a [Handle]. A handle is only good until the
next structural mutation (insertion or removal) of the same set. Each
such mutation bumps the set's revision, and any attempt to use a handle
from an earlier revision fails with [TaskSetError::StaleHandle] instead
of silently addressing the wrong task. Fresh handles can always be
re-obtained with [TaskSet::handles] or [TaskSet::find].
*/

use std::fmt;

use gcd::Gcd;
use thiserror::Error;

use crate::task::Task;
use crate::time::Duration;

/// A reference to a task within a specific revision of a [TaskSet].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Handle {
    index: usize,
    revision: u64,
}

impl Handle {
    /// The position of the task in insertion order.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Error type for handle-based access to a [TaskSet].
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum TaskSetError {
    /// The handle was issued before the set was last modified.
    #[error("stale handle (issued at revision {issued}, set is at revision {current})")]
    StaleHandle { issued: u64, current: u64 },
    /// The handle does not refer to any task in this set.
    #[error("no task at index {index}")]
    NoSuchTask { index: usize },
}

/// An ordered collection of [Task]s.
#[derive(Debug, Clone, Default)]
pub struct TaskSet {
    tasks: Vec<Task>,
    revision: u64,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of structural mutations applied to the set so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Append a task to the set. All previously issued handles become
    /// stale.
    pub fn insert(&mut self, task: Task) -> Handle {
        self.tasks.push(task);
        self.revision += 1;
        Handle {
            index: self.tasks.len() - 1,
            revision: self.revision,
        }
    }

    /// Detach a task from the set and hand it back to the caller. All
    /// previously issued handles become stale.
    pub fn remove(&mut self, handle: Handle) -> Result<Task, TaskSetError> {
        self.check(handle)?;
        self.revision += 1;
        Ok(self.tasks.remove(handle.index))
    }

    fn check(&self, handle: Handle) -> Result<(), TaskSetError> {
        if handle.revision != self.revision {
            Err(TaskSetError::StaleHandle {
                issued: handle.revision,
                current: self.revision,
            })
        } else if handle.index >= self.tasks.len() {
            Err(TaskSetError::NoSuchTask {
                index: handle.index,
            })
        } else {
            Ok(())
        }
    }

    pub fn get(&self, handle: Handle) -> Result<&Task, TaskSetError> {
        self.check(handle)?;
        Ok(&self.tasks[handle.index])
    }

    /// Mutable access to a task's parameters. This is not a structural
    /// mutation and does not invalidate handles.
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut Task, TaskSetError> {
        self.check(handle)?;
        Ok(&mut self.tasks[handle.index])
    }

    /// Look up the first task with the given name.
    pub fn find(&self, name: &str) -> Option<Handle> {
        self.handles().find(|h| self.tasks[h.index].name() == name)
    }

    /// Fresh handles for all tasks, in insertion order.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        (0..self.tasks.len()).map(move |index| Handle {
            index,
            revision: self.revision,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Task> + '_ {
        self.tasks.iter_mut()
    }

    /// Iterate over the tasks together with fresh handles.
    pub fn entries(&self) -> impl Iterator<Item = (Handle, &Task)> + '_ {
        self.handles().zip(self.tasks.iter())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The sum of the thread counts of all tasks.
    pub fn total_threads(&self) -> usize {
        self.tasks.iter().map(Task::threads).sum()
    }

    /// Do all tasks have constrained deadlines?
    pub fn is_constrained(&self) -> bool {
        self.tasks.iter().all(Task::is_constrained)
    }

    /// The largest relative deadline of any task (zero if empty).
    pub fn max_deadline(&self) -> Duration {
        self.tasks.iter().map(|t| t.deadline).max().unwrap_or(0)
    }

    /// The least common multiple of all periods, saturating at
    /// `Duration::MAX` on overflow. Tasks with a zero period are
    /// ignored; an empty set has a hyperperiod of one.
    pub fn hyperperiod(&self) -> Duration {
        self.tasks
            .iter()
            .map(|t| t.period)
            .filter(|p| *p > 0)
            .fold(1, |acc: Duration, p| {
                (acc / acc.gcd(p))
                    .checked_mul(p)
                    .unwrap_or(Duration::MAX)
            })
    }
}

impl FromIterator<Task> for TaskSet {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        let mut ts = TaskSet::new();
        for t in iter {
            ts.insert(t);
        }
        ts
    }
}

impl<'a> IntoIterator for &'a TaskSet {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

/// The header line followed by one line per task.
impl fmt::Display for TaskSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Task::header())?;
        for t in &self.tasks {
            write!(f, "\n{t}")?;
        }
        Ok(())
    }
}
