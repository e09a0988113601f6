use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write as _;
use std::sync::Arc;

use txload_core::runner::{ProgressUpdate, RunSummary};

use crate::config_file::ResolvedRun;

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _run: &ResolvedRun) {}

    fn progress(&self) -> Option<txload_core::runner::ProgressFn> {
        Some(Arc::new(move |u| {
            let line = build_progress_line(&u);
            emit_json_line(&line);
        }))
    }

    fn print_summary(&self, summary: &RunSummary) -> anyhow::Result<()> {
        let line = build_summary_line(summary);
        emit_json_line(&line);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub elapsed_secs: u64,
    pub interval_secs: f64,
    pub active_users: u64,
    pub target_users: u64,
    pub requests_per_sec: f64,
    pub failed_requests_per_sec: f64,
    pub total_requests: u64,
    pub total_failures: u64,
    pub total_tasks: u64,
}

fn build_progress_line(u: &ProgressUpdate) -> JsonProgressLine {
    JsonProgressLine {
        kind: "progress",
        elapsed_secs: u.elapsed.as_secs(),
        interval_secs: u.interval.as_secs_f64(),
        active_users: u.active_users,
        target_users: u.target_users,
        requests_per_sec: u.rps_now,
        failed_requests_per_sec: u.failed_rps_now,
        total_requests: u.requests_total,
        total_failures: u.failures_total,
        total_tasks: u.tasks_total,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub requests: Vec<JsonRequestSummary>,
    pub tasks: BTreeMap<String, u64>,
    pub totals: JsonTotals,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonRequestSummary {
    pub method: String,
    pub name: String,
    pub count: u64,
    pub failures: u64,
    pub errors: BTreeMap<String, u64>,
    pub rps: f64,
    pub latency: Option<JsonLatencySummary>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonLatencySummary {
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
    pub mean_ms: f64,
    pub max_ms: f64,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonTotals {
    pub elapsed_secs: f64,
    pub users_started: u64,
    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub failure_ratio: f64,
    pub tasks_total: u64,
    pub rps: f64,
    pub req_per_sec_avg: f64,
    pub req_per_sec_max: f64,
}

fn build_summary_line(summary: &RunSummary) -> JsonSummaryLine {
    let requests = summary
        .requests
        .iter()
        .map(|r| JsonRequestSummary {
            method: r.method.clone(),
            name: r.name.clone(),
            count: r.count,
            failures: r.failures,
            errors: r.errors.clone(),
            rps: r.rps,
            latency: r.latency.as_ref().map(|l| JsonLatencySummary {
                p50_ms: l.p50_ms,
                p90_ms: l.p90_ms,
                p99_ms: l.p99_ms,
                mean_ms: l.mean_ms,
                max_ms: l.max_ms,
                count: l.count,
            }),
        })
        .collect();

    let tasks = summary
        .tasks
        .iter()
        .map(|t| (t.name.clone(), t.count))
        .collect();

    JsonSummaryLine {
        kind: "summary",
        requests,
        tasks,
        totals: JsonTotals {
            elapsed_secs: summary.elapsed.as_secs_f64(),
            users_started: summary.users_started,
            requests_total: summary.requests_total,
            failed_requests_total: summary.failures_total,
            failure_ratio: summary.failure_ratio(),
            tasks_total: summary.tasks_total,
            rps: summary.rps,
            req_per_sec_avg: summary.req_per_sec_avg,
            req_per_sec_max: summary.req_per_sec_max,
        },
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::time::Duration;
    use txload_core::runner::{RequestSummary, TaskSummary};

    #[test]
    fn progress_line_has_kind() {
        let u = ProgressUpdate {
            tick: 1,
            elapsed: Duration::from_secs(2),
            interval: Duration::from_secs(1),
            total_duration: None,
            active_users: 3,
            target_users: 4,
            requests_total: 10,
            failures_total: 1,
            tasks_total: 9,
            rps_now: 5.0,
            failed_rps_now: 0.5,
        };

        let v: Value = match serde_json::to_value(build_progress_line(&u)) {
            Ok(v) => v,
            Err(err) => panic!("to_value failed: {err}"),
        };
        assert_eq!(v.get("kind").and_then(Value::as_str), Some("progress"));
        assert_eq!(v.get("active_users").and_then(Value::as_u64), Some(3));
        assert_eq!(v.get("total_tasks").and_then(Value::as_u64), Some(9));
    }

    #[test]
    fn summary_line_has_totals() {
        let summary = RunSummary {
            elapsed: Duration::from_secs(4),
            users_started: 2,
            requests_total: 10,
            failures_total: 2,
            tasks_total: 8,
            rps: 2.5,
            req_per_sec_avg: 2.0,
            req_per_sec_max: 4.0,
            requests: vec![RequestSummary {
                method: "DELETE".to_string(),
                name: "/api/transactions/{id}".to_string(),
                count: 10,
                failures: 2,
                errors: BTreeMap::from([("404".to_string(), 2)]),
                rps: 2.5,
                latency: None,
            }],
            tasks: vec![TaskSummary {
                name: "delete_transaction".to_string(),
                count: 8,
            }],
        };

        let v: Value = match serde_json::to_value(build_summary_line(&summary)) {
            Ok(v) => v,
            Err(err) => panic!("to_value failed: {err}"),
        };

        assert_eq!(v.get("kind").and_then(Value::as_str), Some("summary"));
        assert_eq!(
            v.pointer("/totals/requests_total").and_then(Value::as_u64),
            Some(10)
        );
        assert_eq!(
            v.pointer("/requests/0/errors/404").and_then(Value::as_u64),
            Some(2)
        );
        assert_eq!(
            v.pointer("/tasks/delete_transaction")
                .and_then(Value::as_u64),
            Some(8)
        );
    }
}
