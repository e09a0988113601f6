use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Monotonic tick counter (1-based) for progress emissions.
    pub tick: u64,
    pub elapsed: Duration,
    pub interval: Duration,
    /// Configured run duration, if the run is time-bounded.
    pub total_duration: Option<Duration>,
    pub active_users: u64,
    pub target_users: u64,
    pub requests_total: u64,
    pub failures_total: u64,
    pub tasks_total: u64,
    /// Requests/sec observed during the last progress interval.
    pub rps_now: f64,
    /// Failed requests/sec observed during the last progress interval.
    pub failed_rps_now: f64,
}

pub type ProgressFn = std::sync::Arc<dyn Fn(ProgressUpdate) + Send + Sync + 'static>;
