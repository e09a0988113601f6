use std::fmt::Write as _;

use txload_core::runner::{RequestSummary, RunSummary};

use super::format::{format_duration, format_ms, format_rate};

pub(crate) fn render(summary: &RunSummary) -> String {
    let mut out = String::new();

    if summary.requests.is_empty() && summary.tasks.is_empty() {
        out.push_str("summary: no requests sent\n");
        render_totals(summary, &mut out);
        return out;
    }

    out.push_str("summary\n");

    let name_width = summary
        .requests
        .iter()
        .map(|r| r.method.len() + 1 + r.name.len())
        .max()
        .unwrap_or(0)
        .max("request".len());

    writeln!(
        out,
        "  {:<name_width$} {:>8} {:>8} {:>9} {:>9} {:>9} {:>9} {:>7}",
        "request", "count", "failed", "p50", "p90", "p99", "max", "rps"
    )
    .ok();
    for r in &summary.requests {
        render_request(r, name_width, &mut out);
    }

    let failing: Vec<_> = summary
        .requests
        .iter()
        .filter(|r| !r.errors.is_empty())
        .collect();
    if !failing.is_empty() {
        out.push_str("\nerrors\n");
        for r in failing {
            for (key, count) in &r.errors {
                writeln!(out, "  {} {}: {key} x{count}", r.method, r.name).ok();
            }
        }
    }

    if !summary.tasks.is_empty() {
        out.push_str("\ntasks\n");
        for t in &summary.tasks {
            writeln!(out, "  {}: {}", t.name, t.count).ok();
        }
    }

    out.push('\n');
    render_totals(summary, &mut out);
    out
}

fn render_request(r: &RequestSummary, name_width: usize, out: &mut String) {
    let label = format!("{} {}", r.method, r.name);
    let (p50, p90, p99, max) = match &r.latency {
        Some(l) => (
            format_ms(l.p50_ms),
            format_ms(l.p90_ms),
            format_ms(l.p99_ms),
            format_ms(l.max_ms),
        ),
        None => ("-".into(), "-".into(), "-".into(), "-".into()),
    };

    writeln!(
        out,
        "  {label:<name_width$} {:>8} {:>8} {p50:>9} {p90:>9} {p99:>9} {max:>9} {:>7}",
        r.count,
        r.failures,
        format_rate(r.rps)
    )
    .ok();
}

fn render_totals(summary: &RunSummary, out: &mut String) {
    out.push_str("totals\n");
    writeln!(
        out,
        "  requests: {} (failed {}, {:.2}%)",
        summary.requests_total,
        summary.failures_total,
        summary.failure_ratio() * 100.0
    )
    .ok();
    writeln!(out, "  tasks: {}", summary.tasks_total).ok();
    writeln!(out, "  users: {}", summary.users_started).ok();
    writeln!(
        out,
        "  elapsed: {} rps={} (avg {} max {})",
        format_duration(summary.elapsed),
        format_rate(summary.rps),
        format_rate(summary.req_per_sec_avg),
        format_rate(summary.req_per_sec_max)
    )
    .ok();
}
