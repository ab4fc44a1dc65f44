/*! Feasibility analysis and maximal non-preemptive chunks for sporadic tasks under EDF

This crate determines whether a set of sporadic tasks with constrained
deadlines can meet all deadlines on a uniprocessor under
earliest-deadline-first scheduling, using the processor-demand test,
and computes for each task the longest chunk of non-preemptive
execution it may use without breaking feasibility.

The main entry points are:

- [feasibility::FeasibilityEngine], which checks a [taskset::TaskSet]
  at every job deadline up to the bound [feasibility::star_bound];
- [chunks::MaxChunkSolver], which uses the engine as an oracle to
  search for the maximal chunk of each task;
- [load::read_task_set], which reads a task set from a CSV file.

The analysis is purely offline: nothing is ever executed.
*/

pub mod blocking;
pub mod chunks;
pub mod deadlines;
pub mod demand;
pub mod feasibility;
pub mod load;
pub mod task;
pub mod taskset;
pub mod time;
