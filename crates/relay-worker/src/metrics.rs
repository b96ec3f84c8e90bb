//! Metric names recorded by the supervisor.

/// Worker launches that failed and were not retried (counter, labels: kind).
pub const WORKER_LAUNCH_FAILURES_TOTAL: &str = "worker_launch_failures_total";
/// Relaunches after an abnormal worker exit (counter).
pub const WORKER_RESTARTS_TOTAL: &str = "worker_restarts_total";
