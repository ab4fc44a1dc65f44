/*! Processor demand of tasks and task sets

This module provides the trait [DemandBound], which models the classic
*demand-bound function* (DBF) of sporadic tasks with constrained
deadlines, together with utilization and workload. It is implemented
both for individual [Task]s and for whole [TaskSet]s, where the
quantities are simply summed up.

All quantities use the WCET at the task's full declared parallelism,
i.e., `wcet(m)`.
*/

use std::io;

use auto_impl::auto_impl;

use crate::task::Task;
use crate::taskset::TaskSet;
use crate::time::{Duration, Service};

/// The general interface for bounds on processor demand.
#[auto_impl(&, Box, Rc)]
pub trait DemandBound {
    /// The long-run fraction of the processor required.
    fn utilization(&self) -> f64;

    /// Bound the total execution demand of all jobs that both arrive
    /// and have their deadline within any interval of length `delta`.
    fn demand_bound(&self, delta: Duration) -> Service;

    /// The total execution time of one job of each task.
    fn workload(&self) -> Service;
}

impl DemandBound for Task {
    fn utilization(&self) -> f64 {
        match (self.max_wcet(), self.period) {
            (None, _) | (Some(0), _) => 0.0,
            (Some(_), 0) => f64::INFINITY,
            (Some(c), p) => c as f64 / p as f64,
        }
    }

    fn demand_bound(&self, delta: Duration) -> Service {
        if delta < self.deadline {
            return 0;
        }
        let c = self.max_wcet().unwrap_or(0);
        match (delta - self.deadline).checked_div(self.period) {
            Some(jobs) => (jobs + 1).saturating_mul(c),
            // without a minimum separation, jobs arrive without bound
            None if c > 0 => Service::MAX,
            None => 0,
        }
    }

    fn workload(&self) -> Service {
        self.max_wcet().unwrap_or(0)
    }
}

impl DemandBound for TaskSet {
    fn utilization(&self) -> f64 {
        self.iter().map(DemandBound::utilization).sum()
    }

    fn demand_bound(&self, delta: Duration) -> Service {
        self.iter()
            .map(|t| t.demand_bound(delta))
            .fold(0, Service::saturating_add)
    }

    fn workload(&self) -> Service {
        self.iter()
            .map(DemandBound::workload)
            .fold(0, Service::saturating_add)
    }
}

/// Derive a period from a workload and a scaling factor as
/// `ceil(workload * factor)`.
pub fn period_for_utilization(workload: Service, factor: f64) -> Duration {
    (workload as f64 * factor).ceil() as Duration
}

/// Same as [DemandBound::demand_bound] for a single task, but also
/// write the derivation of the result to `out`.
pub fn demand_bound_traced(task: &Task, delta: Duration, out: &mut dyn io::Write) -> io::Result<Service> {
    let demand = task.demand_bound(delta);
    if delta < task.deadline {
        writeln!(
            out,
            "DBF({}, t = {}) = 0 : t < deadline ({} < {})",
            task.name(),
            delta,
            delta,
            task.deadline
        )?;
        return Ok(demand);
    }
    let numerator = delta - task.deadline;
    let denominator = task.period;
    let wcet = task.max_wcet().unwrap_or(0);
    let quotient = numerator.checked_div(denominator).unwrap_or(0);
    writeln!(out, "DBF({}, t = {}) = {}", task.name(), delta, demand)?;
    writeln!(out, "        | {:5} - {:<5}     |", delta, task.deadline)?;
    writeln!(
        out,
        "{:5} * | ------------- + 1 | = {} * ({} + 1) = {:5}",
        wcet, wcet, quotient, demand
    )?;
    writeln!(out, "        |  {:8}         |", denominator)?;
    writeln!(out, "        +-                 -+")?;
    Ok(demand)
}

/// Same as [DemandBound::utilization] for a single task, but also
/// write the derivation of the result to `out`.
pub fn utilization_traced(task: &Task, out: &mut dyn io::Write) -> io::Result<f64> {
    let u = task.utilization();
    writeln!(
        out,
        "U({}) = wcet({}) / period = {} / {} = {:.4}",
        task.name(),
        task.threads(),
        task.max_wcet().unwrap_or(0),
        task.period,
        u
    )?;
    Ok(u)
}

/// Same as [DemandBound::demand_bound] for a task set, but also write
/// the per-task derivations to `out`.
pub fn total_demand_traced(ts: &TaskSet, delta: Duration, out: &mut dyn io::Write) -> io::Result<Service> {
    let mut total: Service = 0;
    for t in ts {
        total = total.saturating_add(demand_bound_traced(t, delta, out)?);
    }
    writeln!(out, "DBF(*, t = {}) = {}", delta, total)?;
    Ok(total)
}
