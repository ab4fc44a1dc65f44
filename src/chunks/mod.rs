/*! Maximal non-preemptive chunk lengths under limited-preemptive EDF

For a feasible task set, [MaxChunkSolver] determines for each task the
largest chunk length `q` such that jobs executing in non-preemptive
chunks of at most `q` time units still pass the demand-based test once
the resulting blocking is accounted for. The blocking term is supplied
by a [BlockingPolicy]; the default is [LimitedPreemptive].

Tasks are processed in insertion order. For each task, the chunk length
is found by bisection on `[1, wcet(m)]`, with the chunks of the tasks
already processed held at their chosen values and all remaining tasks
fully preemptive. Since larger chunks can only increase blocking, the
feasible chunk lengths of a task form a prefix of that interval.

## Citation

- S. Baruah, “The limited-preemption uniprocessor scheduling of sporadic
  task systems”, *Proceedings of the 17th Euromicro Conference on
  Real-Time Systems (ECRTS 2005)*, pp.&nbsp;137--144, July 2005.
*/

use std::io;

use derive_more::Display;

use crate::blocking::{BlockingPolicy, LimitedPreemptive};
use crate::feasibility::{self, FeasibilityEngine, Verdict};
use crate::taskset::TaskSet;
use crate::time::Service;

/// One step of the chunk search, reported to audit traces.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum SearchEvent {
    /// The task set was tested with the given candidate chunk.
    #[display(fmt = "{}: q = {} -> {}", task, chunk, verdict)]
    Probe {
        task: String,
        chunk: Service,
        verdict: Verdict,
    },
    /// The search for one task converged.
    #[display(fmt = "{}: max chunk = {}", task, chunk)]
    Converged { task: String, chunk: Service },
}

/// Searches for the maximal non-preemptive chunk of each task.
#[derive(Debug, Clone, Default)]
pub struct MaxChunkSolver<P = LimitedPreemptive> {
    engine: FeasibilityEngine,
    policy: P,
}

impl MaxChunkSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: BlockingPolicy> MaxChunkSolver<P> {
    pub fn with_policy(policy: P) -> Self {
        MaxChunkSolver {
            engine: FeasibilityEngine::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Determine the maximal chunk of every task and record it in the
    /// task's `chunk` field.
    ///
    /// Chunks are only written back if the search succeeds for every
    /// task. If the task set is malformed, or if it is infeasible even
    /// with chunks of one time unit, it is left untouched.
    pub fn solve(&mut self, ts: &mut TaskSet) -> Verdict {
        self.search(ts, &mut |_| ())
    }

    /// Same as [MaxChunkSolver::solve], but also write every probed
    /// chunk length and the resulting verdict to `out`.
    pub fn solve_traced(&mut self, ts: &mut TaskSet, out: &mut dyn io::Write) -> io::Result<Verdict> {
        let mut status = Ok(());
        let verdict = self.search(ts, &mut |event| {
            if status.is_ok() {
                status = writeln!(out, "{event}");
            }
        });
        status.map(|_| verdict)
    }

    fn search(&mut self, ts: &mut TaskSet, observe: &mut dyn FnMut(&SearchEvent)) -> Verdict {
        if let Err(m) = feasibility::validate(ts) {
            return Verdict::Malformed(m);
        }

        let mut chunks: Vec<Service> = vec![0; ts.len()];
        let view: &TaskSet = ts;
        for (idx, task) in view.iter().enumerate() {
            // validated: every task has threads
            let wcet = task.max_wcet().unwrap_or(1);
            match self.search_task(view, &mut chunks, idx, task.name(), wcet, observe) {
                Verdict::Feasible => (),
                other => return other,
            }
        }

        for (t, q) in ts.iter_mut().zip(chunks) {
            t.chunk = q;
        }
        tracing::debug!(tasks = ts.len(), policy = self.policy.name(), "assigned chunks");
        Verdict::Feasible
    }

    /// Bisect the chunk length of the task at position `idx`, leaving
    /// the result in `chunks[idx]`.
    fn search_task(
        &mut self,
        ts: &TaskSet,
        chunks: &mut [Service],
        idx: usize,
        name: &str,
        wcet: Service,
        observe: &mut dyn FnMut(&SearchEvent),
    ) -> Verdict {
        let mut probe = |engine: &mut FeasibilityEngine, chunks: &mut [Service], q: Service| {
            chunks[idx] = q;
            let verdict = engine.check_with(ts, &self.policy, chunks);
            tracing::trace!(task = name, chunk = q, %verdict, "probe");
            observe(&SearchEvent::Probe {
                task: name.to_string(),
                chunk: q,
                verdict: verdict.clone(),
            });
            verdict
        };

        let verdict = probe(&mut self.engine, chunks, 1);
        if !verdict.is_feasible() {
            return verdict;
        }

        let (mut lo, mut hi) = (1, wcet);
        while lo < hi {
            let mid = lo + (hi - lo + 1) / 2;
            if probe(&mut self.engine, chunks, mid).is_feasible() {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        chunks[idx] = lo;
        observe(&SearchEvent::Converged {
            task: name.to_string(),
            chunk: lo,
        });
        Verdict::Feasible
    }

    /// Test the task set as if every job executed fully
    /// non-preemptively, i.e., with `q_i = wcet_i(m)`. No chunk is
    /// recorded.
    pub fn check_nonpreemptive(&mut self, ts: &TaskSet) -> Verdict {
        let chunks: Vec<Service> = ts.iter().map(|t| t.max_wcet().unwrap_or(0)).collect();
        self.engine.check_with(ts, &self.policy, &chunks)
    }
}
