/*! The task model: a recurring workload with a per-thread-count WCET table

A [Task] releases a job at least every `period` time units. Each job
may use up to `threads` parallel execution threads, and the WCET of a
job depends on how many threads it actually runs on. The WCET table
is addressed with 1-based thread counts (`wcet(1)` is the WCET on a
single thread), while the storage behind it is an ordinary vector.
*/

use std::fmt;

use itertools::Itertools;
use thiserror::Error;

use crate::time::{Duration, Service};

/// Error type for operations that address a task's WCET table.
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum TaskError {
    /// The given thread count is not in `1..=threads`.
    #[error("thread count {requested} is outside of 1..={threads}")]
    ThreadCountOutOfRange { requested: usize, threads: usize },
    /// A task cannot be duplicated with more threads than it has.
    #[error("cannot duplicate a task with {threads} threads into one with {requested} threads")]
    DuplicateTooWide { requested: usize, threads: usize },
    /// The operation requires a non-empty WCET table.
    #[error("task has no threads")]
    NoThreads,
}

/// A single sporadic task with a per-thread-count WCET table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Task {
    name: String,
    /// The minimum inter-arrival time between two job releases.
    pub period: Duration,
    /// The relative deadline of each job.
    pub deadline: Duration,
    /// The maximum length of a non-preemptive execution chunk; zero
    /// denotes fully preemptive execution.
    pub chunk: Service,
    wcet: Vec<Service>,
}

impl Task {
    /// Create a new task with a zero-filled WCET table of `threads`
    /// entries. All parameters may be zero.
    pub fn new(period: Duration, deadline: Duration, threads: usize) -> Self {
        Task {
            name: String::new(),
            period,
            deadline,
            chunk: 0,
            wcet: vec![0; threads],
        }
    }

    /// Convenience constructor for a named task whose WCET table is
    /// given in order of increasing thread count.
    pub fn with_wcets(
        name: impl Into<String>,
        period: Duration,
        deadline: Duration,
        wcets: impl IntoIterator<Item = Service>,
    ) -> Self {
        Task {
            name: name.into(),
            period,
            deadline,
            chunk: 0,
            wcet: wcets.into_iter().collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The maximum number of threads a job of this task may use.
    pub fn threads(&self) -> usize {
        self.wcet.len()
    }

    /// Change the number of threads. The previous WCET table is
    /// discarded; the caller must repopulate it.
    pub fn set_threads(&mut self, threads: usize) -> usize {
        self.wcet = vec![0; threads];
        threads
    }

    /// The WCET of a job running on exactly `threads` threads.
    pub fn wcet(&self, threads: usize) -> Option<Service> {
        threads
            .checked_sub(1)
            .and_then(|idx| self.wcet.get(idx))
            .copied()
    }

    /// Update the WCET of a job running on exactly `threads` threads.
    pub fn set_wcet(&mut self, threads: usize, wcet: Service) -> Result<(), TaskError> {
        let available = self.threads();
        let slot = threads
            .checked_sub(1)
            .and_then(|idx| self.wcet.get_mut(idx))
            .ok_or(TaskError::ThreadCountOutOfRange {
                requested: threads,
                threads: available,
            })?;
        *slot = wcet;
        Ok(())
    }

    /// The WCET at the task's full declared parallelism, i.e., `wcet(m)`.
    pub fn max_wcet(&self) -> Option<Service> {
        self.wcet.last().copied()
    }

    /// The whole WCET table, indexed from zero.
    pub fn wcets(&self) -> &[Service] {
        &self.wcet
    }

    /// Does the task have a constrained deadline (`D <= P`)?
    pub fn is_constrained(&self) -> bool {
        self.deadline <= self.period
    }

    /// Create a copy of this task that uses at most `threads` threads.
    /// Only the WCETs up to `threads` are carried over; the chunk is not.
    pub fn duplicate(&self, threads: usize) -> Result<Task, TaskError> {
        if threads > self.threads() {
            return Err(TaskError::DuplicateTooWide {
                requested: threads,
                threads: self.threads(),
            });
        }
        Ok(Task {
            name: self.name.clone(),
            period: self.period,
            deadline: self.deadline,
            chunk: 0,
            wcet: self.wcet[..threads].to_vec(),
        })
    }

    /// Collapse the task into a single-threaded task whose WCET is the
    /// former `wcet(m)`.
    pub fn merge(&mut self) -> Result<(), TaskError> {
        let c = self.max_wcet().ok_or(TaskError::NoThreads)?;
        self.wcet = vec![c];
        Ok(())
    }

    /// Rebuild the WCET table from `wcet(m)` assuming that every
    /// additional thread adds `factor` times the single-thread WCET
    /// as parallelization overhead:
    ///
    /// `wcet(i) = ceil(one + (i - 1) * factor * one)`, where
    /// `one = wcet(m) / (1 + (m - 1) * factor)`.
    pub fn apply_growth_factor(&mut self, factor: f64) -> Result<(), TaskError> {
        let m = self.threads();
        let c = self.max_wcet().ok_or(TaskError::NoThreads)?;
        let one = c as f64 / (1.0 + (m - 1) as f64 * factor);
        for (i, slot) in self.wcet.iter_mut().enumerate() {
            *slot = (i as f64).mul_add(factor * one, one).ceil() as Service;
        }
        Ok(())
    }

    /// The column header matching the [Display][fmt::Display] format.
    pub fn header() -> &'static str {
        "(period, dedlin, tpj.) [util(m) chunk name]\twcet{c(1), c(2), ..., c(m)}"
    }
}

/// One line of the form
/// `(p:  P, d:  D, m: M) [u:U, q:Q, name]\twcet{c1, c2, ..., cm} `.
impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use crate::demand::DemandBound;

        write!(
            f,
            "(p:{:4}, d:{:4}, m:{:2}) [u:{:.3}, q:{}, {}]\twcet{{{}}} ",
            self.period,
            self.deadline,
            self.threads(),
            self.utilization(),
            self.chunk,
            self.name,
            self.wcet.iter().map(|c| format!("{c:3}")).join(", ")
        )
    }
}

#[cfg(test)]
mod tests;
