/*! Blocking due to non-preemptive execution

When jobs execute in non-preemptive chunks, a job with an early
deadline may have to wait for a chunk of a job with a later deadline
that started just before it arrived. The trait [BlockingPolicy] bounds
this priority inversion for an interval of a given length, so that the
feasibility test can fold it into the processor demand.

Chunk lengths are passed as a slice aligned with the insertion order
of the task set; missing entries count as zero (fully preemptive).
*/

use auto_impl::auto_impl;

use crate::taskset::TaskSet;
use crate::time::{Duration, Service};

/// Generic interface for bounds on blocking due to non-preemptive chunks.
#[auto_impl(&, Box, Rc)]
pub trait BlockingPolicy {
    /// A short name for logs and audit traces.
    fn name(&self) -> &'static str;

    /// Bound the blocking suffered by jobs whose deadlines fall into
    /// an interval of length `delta`, given the chunk length of each
    /// task in `ts`.
    fn blocking_bound(&self, ts: &TaskSet, chunks: &[Service], delta: Duration) -> Service;
}

/// Fully preemptive execution: there is never any blocking.
#[derive(Debug, Clone, Copy, Default)]
pub struct Preemptive;

impl BlockingPolicy for Preemptive {
    fn name(&self) -> &'static str {
        "preemptive"
    }

    fn blocking_bound(&self, _ts: &TaskSet, _chunks: &[Service], _delta: Duration) -> Service {
        0
    }
}

/// Limited-preemptive EDF in the style of Baruah (ECRTS 2005).
///
/// A job can only be blocked by a chunk of a task whose relative
/// deadline exceeds the interval length, and only after that chunk has
/// started, i.e., by at most the chunk length minus one time unit:
///
/// `B(delta) = max { q_j - 1 : D_j > delta }`
///
/// With `q_j = 1` a task never blocks anyone; with `q_j = wcet_j(m)` the
/// bound coincides with the classic fully non-preemptive EDF blocking
/// term of George et al.
#[derive(Debug, Clone, Copy, Default)]
pub struct LimitedPreemptive;

impl BlockingPolicy for LimitedPreemptive {
    fn name(&self) -> &'static str {
        "limited-preemptive"
    }

    fn blocking_bound(&self, ts: &TaskSet, chunks: &[Service], delta: Duration) -> Service {
        ts.iter()
            .zip(chunks.iter().copied().chain(std::iter::repeat(0)))
            .filter(|(t, _)| t.deadline > delta)
            .map(|(_, q)| q.saturating_sub(1))
            .max()
            .unwrap_or(0)
    }
}
