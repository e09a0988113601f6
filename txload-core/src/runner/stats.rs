use hdrhistogram::Histogram;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::http::HttpTransportErrorKind;

#[derive(Debug, Clone, Copy)]
pub struct RequestMeta<'a> {
    pub method: &'a str,
    /// Grouping name, e.g. `/api/transactions/{id}` rather than the concrete path.
    pub name: &'a str,
    pub status: Option<u16>,
    /// If set, the request failed before a status was received.
    pub transport_error_kind: Option<HttpTransportErrorKind>,
    pub elapsed: Duration,
}

impl RequestMeta<'_> {
    fn is_failure(&self) -> bool {
        self.transport_error_kind.is_some() || self.status.is_none_or(|s| s >= 400)
    }

    fn error_key(&self) -> Option<String> {
        if let Some(kind) = self.transport_error_kind {
            return Some(kind.to_string());
        }
        match self.status {
            Some(s) if s >= 400 => Some(s.to_string()),
            Some(_) => None,
            None => Some("unknown".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatencySummary {
    pub count: u64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
    pub mean_ms: f64,
    pub max_ms: f64,
}

#[derive(Debug, Clone)]
pub struct RequestSummary {
    pub method: String,
    pub name: String,
    pub count: u64,
    pub failures: u64,
    /// Failures keyed by status code or transport error kind.
    pub errors: BTreeMap<String, u64>,
    pub rps: f64,
    pub latency: Option<LatencySummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub elapsed: Duration,
    pub users_started: u64,
    pub requests_total: u64,
    pub failures_total: u64,
    pub tasks_total: u64,
    pub rps: f64,
    pub req_per_sec_avg: f64,
    pub req_per_sec_max: f64,
    pub requests: Vec<RequestSummary>,
    pub tasks: Vec<TaskSummary>,
}

impl RunSummary {
    /// Failed requests / total requests (0 when nothing was sent).
    #[must_use]
    pub fn failure_ratio(&self) -> f64 {
        if self.requests_total == 0 {
            return 0.0;
        }
        (self.failures_total as f64) / (self.requests_total as f64)
    }

    pub fn request(&self, method: &str, name: &str) -> Option<&RequestSummary> {
        self.requests
            .iter()
            .find(|r| r.method == method && r.name == name)
    }

    pub fn task_count(&self, name: &str) -> u64 {
        self.tasks
            .iter()
            .find(|t| t.name == name)
            .map_or(0, |t| t.count)
    }
}

#[derive(Debug)]
struct RequestSeries {
    count: u64,
    failures: u64,
    errors: BTreeMap<String, u64>,
    latency_us: Histogram<u64>,
}

impl RequestSeries {
    fn new() -> Self {
        // Track up to 60s in microseconds (with 3 sigfigs).
        let latency_us = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3)
            .unwrap_or_else(|err| panic!("failed to init histogram: {err}"));
        Self {
            count: 0,
            failures: 0,
            errors: BTreeMap::new(),
            latency_us,
        }
    }

    fn latency(&self) -> Option<LatencySummary> {
        let h = &self.latency_us;
        if h.is_empty() {
            return None;
        }
        let ms = |us: u64| (us as f64) / 1000.0;
        Some(LatencySummary {
            count: h.len(),
            p50_ms: ms(h.value_at_quantile(0.50)),
            p90_ms: ms(h.value_at_quantile(0.90)),
            p99_ms: ms(h.value_at_quantile(0.99)),
            mean_ms: h.mean() / 1000.0,
            max_ms: ms(h.max()),
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct RpsAgg {
    count: u64,
    mean: f64,
    max: f64,
}

impl RpsAgg {
    fn record(&mut self, sample: f64) {
        if !sample.is_finite() {
            return;
        }

        self.count = self.count.saturating_add(1);
        self.mean += (sample - self.mean) / (self.count as f64);
        self.max = self.max.max(sample);
    }
}

/// Run-wide statistics, shared by every simulated user.
#[derive(Debug, Default)]
pub struct RunStats {
    requests_total: AtomicU64,
    failures_total: AtomicU64,
    tasks_total: AtomicU64,
    users_started: AtomicU64,
    users_active: AtomicU64,
    series: Mutex<BTreeMap<(String, String), RequestSeries>>,
    tasks: Mutex<BTreeMap<&'static str, u64>>,
    rps_samples: Mutex<RpsAgg>,
}

impl RunStats {
    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn failures_total(&self) -> u64 {
        self.failures_total.load(Ordering::Relaxed)
    }

    pub fn tasks_total(&self) -> u64 {
        self.tasks_total.load(Ordering::Relaxed)
    }

    pub fn active_users(&self) -> u64 {
        self.users_active.load(Ordering::Relaxed)
    }

    pub fn users_started(&self) -> u64 {
        self.users_started.load(Ordering::Relaxed)
    }

    pub fn user_started(&self) {
        self.users_started.fetch_add(1, Ordering::Relaxed);
        self.users_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn user_stopped(&self) {
        self.users_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_task(&self, name: &'static str) {
        self.tasks_total.fetch_add(1, Ordering::Relaxed);
        let mut tasks = self
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *tasks.entry(name).or_insert(0) += 1;
    }

    pub fn record_request(&self, req: RequestMeta<'_>) {
        let failed = req.is_failure();
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failures_total.fetch_add(1, Ordering::Relaxed);
        }

        let mut series = self
            .series
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = series
            .entry((req.name.to_string(), req.method.to_string()))
            .or_insert_with(RequestSeries::new);

        entry.count += 1;
        if failed {
            entry.failures += 1;
        }
        if let Some(key) = req.error_key() {
            *entry.errors.entry(key).or_insert(0) += 1;
        }
        if req.transport_error_kind.is_none() {
            let us = u64::try_from(req.elapsed.as_micros()).unwrap_or(u64::MAX);
            entry.latency_us.saturating_record(us.max(1));
        }
    }

    pub fn record_rps_sample(&self, rps_now: f64) {
        let mut agg = self
            .rps_samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        agg.record(rps_now);
    }

    pub fn summarize(&self, elapsed: Duration) -> RunSummary {
        let secs = elapsed.as_secs_f64().max(1e-9);

        let requests = {
            let series = self
                .series
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            series
                .iter()
                .map(|((name, method), s)| RequestSummary {
                    method: method.clone(),
                    name: name.clone(),
                    count: s.count,
                    failures: s.failures,
                    errors: s.errors.clone(),
                    rps: (s.count as f64) / secs,
                    latency: s.latency(),
                })
                .collect()
        };

        let tasks = {
            let tasks = self
                .tasks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            tasks
                .iter()
                .map(|(name, count)| TaskSummary {
                    name: (*name).to_string(),
                    count: *count,
                })
                .collect()
        };

        let rps_agg = *self
            .rps_samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let requests_total = self.requests_total();
        RunSummary {
            elapsed,
            users_started: self.users_started(),
            requests_total,
            failures_total: self.failures_total(),
            tasks_total: self.tasks_total(),
            rps: (requests_total as f64) / secs,
            req_per_sec_avg: rps_agg.mean,
            req_per_sec_max: rps_agg.max,
            requests,
            tasks,
        }
    }
}
