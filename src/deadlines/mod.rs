/*! The ordered list of absolute job deadlines up to a horizon

The feasibility test only needs to look at instants at which some job
has its deadline. This module collects those instants, together with
the tasks whose jobs are due at each of them, in strictly increasing
order. The list is built for some horizon and can later be extended
to a larger horizon without revisiting the instants already covered.
*/

use std::collections::btree_map::{self, BTreeMap};

use thiserror::Error;

use crate::task::Task;
use crate::taskset::{Handle, TaskSet};
use crate::time::Instant;

/// Error type for horizon extension.
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum DeadlineError {
    /// The list only grows forward.
    #[error("cannot extend the deadline list from {prev} to {new}")]
    NotForward { prev: Instant, new: Instant },
}

/// All tasks that have a job due at one absolute instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlineEntry {
    deadline: Instant,
    tasks: Vec<Handle>,
}

impl DeadlineEntry {
    pub fn new(deadline: Instant, task: Handle) -> Self {
        DeadlineEntry {
            deadline,
            tasks: vec![task],
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// The tasks due at this instant, in the order they were added.
    pub fn tasks(&self) -> &[Handle] {
        &self.tasks
    }

    fn merge(&mut self, other: DeadlineEntry) {
        for h in other.tasks {
            if !self.tasks.contains(&h) {
                self.tasks.push(h);
            }
        }
    }
}

/// Deadline instants in strictly increasing order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedDeadlineList {
    entries: BTreeMap<Instant, DeadlineEntry>,
    horizon: Instant,
}

impl OrderedDeadlineList {
    pub fn new() -> Self {
        Self::default()
    }

    /// The furthest horizon the list has been built or extended to.
    pub fn horizon(&self) -> Instant {
        self.horizon
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an entry, merging its tasks into an existing entry for
    /// the same instant if there is one.
    pub fn insert(&mut self, entry: DeadlineEntry) {
        match self.entries.entry(entry.deadline) {
            btree_map::Entry::Occupied(mut e) => e.get_mut().merge(entry),
            btree_map::Entry::Vacant(e) => {
                e.insert(entry);
            }
        }
    }

    /// Exact-match lookup.
    pub fn find(&self, deadline: Instant) -> Option<&DeadlineEntry> {
        self.entries.get(&deadline)
    }

    /// Iterate over all entries in increasing order of deadline.
    pub fn iter(&self) -> impl Iterator<Item = &DeadlineEntry> + '_ {
        self.entries.values()
    }

    /// Iterate over all entries with a deadline of at most `limit`.
    pub fn up_to(&self, limit: Instant) -> impl Iterator<Item = &DeadlineEntry> + '_ {
        self.entries.range(..=limit).map(|(_, e)| e)
    }

    /// Insert every job deadline of every task in `ts` that is at most
    /// `horizon`. Returns the number of job deadlines inserted.
    pub fn fill(&mut self, ts: &TaskSet, horizon: Instant) -> usize {
        let n = ts
            .entries()
            .map(|(h, t)| self.insert_task_range(h, t, None, horizon))
            .sum();
        self.horizon = self.horizon.max(horizon);
        n
    }

    /// Insert only the job deadlines in `(prev, new]` of every task in
    /// `ts`. The work done is proportional to the number of newly
    /// inserted deadlines, not to the length of the history.
    pub fn extend(&mut self, ts: &TaskSet, prev: Instant, new: Instant) -> Result<usize, DeadlineError> {
        if new <= prev {
            return Err(DeadlineError::NotForward { prev, new });
        }
        let n = ts
            .entries()
            .map(|(h, t)| self.insert_task_range(h, t, Some(prev), new))
            .sum();
        self.horizon = self.horizon.max(new);
        Ok(n)
    }

    fn insert_task_range(&mut self, handle: Handle, task: &Task, after: Option<Instant>, until: Instant) -> usize {
        let mut n = 0;
        for d in job_deadlines(task, after).take_while(|d| *d <= until) {
            self.insert(DeadlineEntry::new(d, handle));
            n += 1;
        }
        n
    }
}

/// The absolute deadlines `D + i * P` of a task's jobs, starting with
/// the first one that is strictly after `after` (if given).
fn job_deadlines(task: &Task, after: Option<Instant>) -> impl Iterator<Item = Instant> {
    let (d, p) = (task.deadline, task.period);
    let first = match after {
        Some(prev) if prev >= d && p > 0 => (prev - d) / p + 1,
        _ => 0,
    };
    (first..)
        .map_while(move |i| i.checked_mul(p).and_then(|off| off.checked_add(d)))
        // a zero period yields a single job
        .take(if p == 0 { 1 } else { usize::MAX })
        .filter(move |dl| after.map_or(true, |prev| *dl > prev))
}
