use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// One bar for time-bounded runs, a spinner otherwise. Drawn on stderr.
pub(crate) struct HumanProgress {
    inner: Mutex<Option<Bar>>,
}

struct Bar {
    kind: ProgressBarKind,
    pb: ProgressBar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProgressBarKind {
    Spinner,
    Bar,
}

impl HumanProgress {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    pub(crate) fn update(
        &self,
        total_duration_opt: Option<Duration>,
        elapsed: Duration,
        message: String,
    ) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let desired_kind = if total_duration_opt.is_some() {
            ProgressBarKind::Bar
        } else {
            ProgressBarKind::Spinner
        };

        if inner.as_ref().is_some_and(|b| b.kind != desired_kind)
            && let Some(old) = inner.take()
        {
            old.pb.finish_and_clear();
        }

        let bar = inner.get_or_insert_with(|| new_bar(desired_kind));
        bar.pb.set_message(message);

        match total_duration_opt {
            Some(total_d) => {
                let total_ms = u64::try_from(total_d.as_millis()).unwrap_or(u64::MAX);
                let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                bar.pb.set_length(total_ms);
                bar.pb.set_position(elapsed_ms.min(total_ms));
            }
            None => {
                bar.pb.tick();
            }
        }
    }

    pub(crate) fn finish(&self) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(bar) = inner.take() {
            bar.pb.finish_and_clear();
        }
    }
}

fn new_bar(kind: ProgressBarKind) -> Bar {
    let pb = match kind {
        ProgressBarKind::Bar => {
            let pb = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr_with_hz(5));
            pb.set_style(bar_style());
            pb
        }
        ProgressBarKind::Spinner => {
            let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr_with_hz(5));
            pb.set_style(spinner_style());
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        }
    };
    pb.set_prefix("txload");
    Bar { kind, pb }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix} [ {bar:20.cyan/blue} ] {percent:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█░")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix} {spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}
