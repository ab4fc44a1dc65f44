/// All analyses in this crate use a simple discrete time model.
pub type Time = u64;

/// Syntactic sugar to give a hint that a time value indicates an
/// absolute point in time, e.g., the absolute deadline of a job.
pub type Instant = Time;

/// Syntactic sugar to give a hint that a time value denotes an
/// interval length, e.g., a period or a relative deadline.
pub type Duration = Time;

/// Syntactic sugar to give a hint that a time value represents some
/// amount of processor service (execution time or demand).
pub type Service = Time;

/// The difference between elapsed time and processor demand, which
/// may be negative if demand exceeds the available time.
pub type Slack = i64;

/// Compute `t - demand` as a signed quantity, saturating at the
/// bounds of [Slack].
pub fn slack_of(t: Duration, demand: Service) -> Slack {
    let diff = i128::from(t) - i128::from(demand);
    diff.clamp(i128::from(Slack::MIN), i128::from(Slack::MAX)) as Slack
}
