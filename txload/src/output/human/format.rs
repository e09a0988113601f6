use std::time::Duration;

pub(crate) fn format_rate(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.0}")
    } else {
        "0".to_string()
    }
}

/// Render as a single rounded component: `ms` below one second, otherwise `s`.
pub(crate) fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms >= 1_000 {
        return format!("{}s", (ms + 500) / 1_000);
    }
    format!("{ms}ms")
}

pub(crate) fn format_ms(v: f64) -> String {
    if !v.is_finite() {
        return "-".to_string();
    }
    if v >= 1_000.0 {
        return format!("{:.2}s", v / 1_000.0);
    }
    if v >= 10.0 {
        return format!("{v:.0}ms");
    }
    format!("{v:.2}ms")
}
