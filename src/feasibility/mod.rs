/*! Processor-demand feasibility test for constrained-deadline sporadic tasks under EDF

A task set is feasible on a dedicated uniprocessor iff, for every
interval length `t`, the total demand-bound function does not exceed
`t`. Since demand only changes at absolute job deadlines, only those
instants need to be checked, and only up to the bound `T*` computed by
[star_bound], beyond which no new violation can first appear.

The test is performed by a [FeasibilityEngine], which keeps the
[OrderedDeadlineList] between queries so that repeated checks of the
same task set (e.g., during the chunk search) reuse the deadline
instants instead of recomputing them.

## Citation

- S. Baruah, A. Mok, and L. Rosier, “Preemptively scheduling
  hard-real-time sporadic tasks on one processor”, *Proceedings of the
  11th Real-Time Systems Symposium*, 1990.
- I. Ripoll, A. Crespo, and A. Mok, “Improvement in feasibility testing
  for real-time tasks”, *Real-Time Systems* 11(1), 1996.
*/

use std::io;

use derive_more::Display;
use gcd::Gcd;
use thiserror::Error;

use crate::blocking::{BlockingPolicy, Preemptive};
use crate::deadlines::OrderedDeadlineList;
use crate::demand::DemandBound;
use crate::taskset::TaskSet;
use crate::time::{self, Duration, Instant, Service, Slack};

/// Reasons why a task set violates a precondition of the analysis.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Malformation {
    #[error("the task set is empty")]
    EmptyTaskSet,
    #[error("task {name:?} has a zero period")]
    ZeroPeriod { name: String },
    #[error("task {name:?} has a zero deadline")]
    ZeroDeadline { name: String },
    #[error("task {name:?} has no threads")]
    NoThreads { name: String },
    #[error("task {name:?} has a zero WCET for {threads} thread(s)")]
    ZeroWcet { name: String, threads: usize },
    #[error("task {name:?} has an unconstrained deadline ({deadline} > {period})")]
    UnconstrainedDeadline {
        name: String,
        deadline: Duration,
        period: Duration,
    },
    #[error("total utilization {utilization:.4} is not below one")]
    Overutilized { utilization: f64 },
}

/// The outcome of a feasibility test.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum Verdict {
    /// Every deadline instant up to `T*` has non-negative slack.
    #[display(fmt = "Yes")]
    Feasible,
    /// Some deadline instant has negative slack.
    #[display(fmt = "No")]
    Infeasible,
    /// The task set violates a modeling precondition.
    #[display(fmt = "N/A (Poorly formed set)")]
    Malformed(Malformation),
}

impl Verdict {
    pub fn is_feasible(&self) -> bool {
        matches!(self, Verdict::Feasible)
    }

    /// The process exit status conventionally associated with the
    /// verdict: 0 if feasible, 1 if infeasible, and 255 (i.e., -1) if
    /// the input is malformed.
    pub fn exit_code(&self) -> u8 {
        match self {
            Verdict::Feasible => 0,
            Verdict::Infeasible => 1,
            Verdict::Malformed(_) => 255,
        }
    }
}

impl From<Malformation> for Verdict {
    fn from(m: Malformation) -> Self {
        Verdict::Malformed(m)
    }
}

/// Check all modeling preconditions of the feasibility test.
pub fn validate(ts: &TaskSet) -> Result<(), Malformation> {
    if ts.is_empty() {
        return Err(Malformation::EmptyTaskSet);
    }
    for t in ts {
        let name = || t.name().to_string();
        if t.period == 0 {
            return Err(Malformation::ZeroPeriod { name: name() });
        }
        if t.deadline == 0 {
            return Err(Malformation::ZeroDeadline { name: name() });
        }
        if t.threads() == 0 {
            return Err(Malformation::NoThreads { name: name() });
        }
        if let Some(idx) = t.wcets().iter().position(|c| *c == 0) {
            return Err(Malformation::ZeroWcet {
                name: name(),
                threads: idx + 1,
            });
        }
        if !t.is_constrained() {
            return Err(Malformation::UnconstrainedDeadline {
                name: name(),
                deadline: t.deadline,
                period: t.period,
            });
        }
    }
    let overutilized = match Load::of(ts) {
        Some(load) => load.busy >= load.scale,
        None => ts.utilization() >= 1.0,
    };
    if overutilized {
        return Err(Malformation::Overutilized {
            utilization: ts.utilization(),
        });
    }
    Ok(())
}

/// Total utilization and weighted laxity of a task set as exact
/// fractions over the common denominator `scale = lcm(P_i)`:
///
/// - `U = busy / scale`
/// - `sum_i U_i * (P_i - D_i) = laxity / scale`
///
/// Requires non-zero periods and constrained deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Load {
    scale: u128,
    busy: u128,
    laxity: u128,
}

impl Load {
    /// `None` if any intermediate value overflows.
    fn of(ts: &TaskSet) -> Option<Load> {
        let scale = ts.iter().try_fold(1u128, |acc, t| {
            let p = u128::from(t.period);
            (acc / acc.gcd(p)).checked_mul(p)
        })?;
        let mut busy: u128 = 0;
        let mut laxity: u128 = 0;
        for t in ts {
            let jobs = scale / u128::from(t.period);
            let share = u128::from(t.max_wcet().unwrap_or(0)).checked_mul(jobs)?;
            let slack = u128::from(t.period.saturating_sub(t.deadline));
            busy = busy.checked_add(share)?;
            laxity = laxity.checked_add(share.checked_mul(slack)?)?;
        }
        Some(Load {
            scale,
            busy,
            laxity,
        })
    }

    /// `floor(laxity / (scale - busy))`, saturating.
    fn star_term(&self) -> Duration {
        self.scale
            .checked_sub(self.busy)
            .and_then(|idle| self.laxity.checked_div(idle))
            .map_or(Duration::MAX, |la| Duration::try_from(la).unwrap_or(Duration::MAX))
    }
}

/// Compute the horizon `T*` up to which deadline instants must be
/// checked:
///
/// `T* = min(HP, max(D_max, sum_i U_i * (P_i - D_i) / (1 - U)))`
///
/// The task set is validated first, since the bound is meaningless
/// for a total utilization of one or more.
pub fn star_bound(ts: &TaskSet) -> Result<Duration, Malformation> {
    validate(ts)?;
    Ok(star_bound_unchecked(ts))
}

fn star_bound_unchecked(ts: &TaskSet) -> Duration {
    let la = match Load::of(ts) {
        Some(load) => load.star_term(),
        None => {
            let u = ts.utilization();
            let weighted_laxity: f64 = ts
                .iter()
                .map(|t| t.utilization() * (t.period - t.deadline) as f64)
                .sum();
            // float-to-integer casts saturate
            (weighted_laxity / (1.0 - u)).floor() as Duration
        }
    };
    ts.hyperperiod().min(ts.max_deadline().max(la))
}

/// The total demand of the task set in an interval of length `t`.
pub fn demand(ts: &TaskSet, t: Duration) -> Service {
    ts.demand_bound(t)
}

/// The time left in an interval of length `t` after the total demand
/// has been served; negative if the demand cannot be met.
pub fn slack(ts: &TaskSet, t: Duration) -> Slack {
    time::slack_of(t, demand(ts, t))
}

/// The quantities checked at one deadline instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(
    fmt = "t = {}: demand = {}, blocking = {}, slack = {}",
    instant,
    demand,
    blocking,
    slack
)]
pub struct DemandPoint {
    pub instant: Instant,
    pub demand: Service,
    pub blocking: Service,
    pub slack: Slack,
}

/// The task parameters the deadline list was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fingerprint {
    revision: u64,
    params: Vec<(Duration, Duration)>,
}

impl Fingerprint {
    fn of(ts: &TaskSet) -> Self {
        Fingerprint {
            revision: ts.revision(),
            params: ts.iter().map(|t| (t.period, t.deadline)).collect(),
        }
    }
}

/// Runs feasibility tests while caching the deadline instants of the
/// most recently analyzed task set.
#[derive(Debug, Clone, Default)]
pub struct FeasibilityEngine {
    deadlines: OrderedDeadlineList,
    built_for: Option<Fingerprint>,
}

impl FeasibilityEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The deadline instants collected so far.
    pub fn deadlines(&self) -> &OrderedDeadlineList {
        &self.deadlines
    }

    /// Make sure the deadline list covers all job deadlines of `ts` up
    /// to `horizon`, growing it incrementally where possible.
    fn prepare(&mut self, ts: &TaskSet, horizon: Instant) {
        let fp = Fingerprint::of(ts);
        if self.built_for.as_ref() != Some(&fp) {
            self.deadlines = OrderedDeadlineList::new();
            let n = self.deadlines.fill(ts, horizon);
            tracing::trace!(horizon, jobs = n, "built deadline list");
            self.built_for = Some(fp);
        } else {
            let prev = self.deadlines.horizon();
            // fails if the list already reaches far enough
            if let Ok(n) = self.deadlines.extend(ts, prev, horizon) {
                tracing::trace!(prev, horizon, jobs = n, "extended deadline list");
            }
        }
    }

    /// Test a fully preemptive task set.
    pub fn check(&mut self, ts: &TaskSet) -> Verdict {
        self.check_with(ts, &Preemptive, &[])
    }

    /// Test the task set with the blocking caused by the given chunk
    /// lengths (aligned with the insertion order of `ts`) folded into
    /// the demand.
    pub fn check_with<P>(&mut self, ts: &TaskSet, policy: &P, chunks: &[Service]) -> Verdict
    where
        P: BlockingPolicy + ?Sized,
    {
        self.run(ts, policy, chunks, &mut |_| ())
    }

    /// Same as [FeasibilityEngine::check_with], but also write every
    /// checked deadline instant to `out`.
    pub fn check_traced<P>(
        &mut self,
        ts: &TaskSet,
        policy: &P,
        chunks: &[Service],
        out: &mut dyn io::Write,
    ) -> io::Result<Verdict>
    where
        P: BlockingPolicy + ?Sized,
    {
        let mut status = Ok(());
        let verdict = self.run(ts, policy, chunks, &mut |point| {
            if status.is_ok() {
                status = writeln!(out, "{point}");
            }
        });
        status.map(|_| verdict)
    }

    fn run<P>(
        &mut self,
        ts: &TaskSet,
        policy: &P,
        chunks: &[Service],
        observe: &mut dyn FnMut(&DemandPoint),
    ) -> Verdict
    where
        P: BlockingPolicy + ?Sized,
    {
        if let Err(m) = validate(ts) {
            tracing::debug!(reason = %m, "malformed task set");
            return Verdict::Malformed(m);
        }
        let bound = star_bound_unchecked(ts);
        self.prepare(ts, bound);

        for entry in self.deadlines.up_to(bound) {
            let instant = entry.deadline();
            let demand = demand(ts, instant);
            let blocking = policy.blocking_bound(ts, chunks, instant);
            let point = DemandPoint {
                instant,
                demand,
                blocking,
                slack: time::slack_of(instant, demand.saturating_add(blocking)),
            };
            observe(&point);
            if point.slack < 0 {
                tracing::debug!(instant, demand, blocking, policy = policy.name(), "deadline miss");
                return Verdict::Infeasible;
            }
        }
        tracing::debug!(t_star = bound, policy = policy.name(), "feasible");
        Verdict::Feasible
    }
}

#[cfg(test)]
mod tests;
