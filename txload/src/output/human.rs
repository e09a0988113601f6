use std::sync::Arc;

mod format;
mod progress;
mod summary;

use format::{format_duration, format_rate};
use progress::HumanProgress;
use summary::render;

use crate::config_file::ResolvedRun;

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, run: &ResolvedRun) {
        println!("host: {}", run.run.host);
        println!(
            "variant: {} users={} spawn_rate={} iterations={} duration={}",
            run.driver.variant,
            run.run.users,
            run.run
                .spawn_rate
                .map_or_else(|| "all".to_string(), |r| format!("{r}/s")),
            run.run
                .iterations
                .map_or_else(|| "-".to_string(), |n| n.to_string()),
            run.run
                .duration
                .map_or_else(|| "until interrupted".to_string(), format_duration),
        );
        println!();
    }

    fn progress(&self) -> Option<txload_core::runner::ProgressFn> {
        let progress = self.progress.clone();

        Some(Arc::new(move |u| {
            let message = format!(
                "users={}/{} elapsed={} rps={} failed/s={} requests={} failures={} tasks={}",
                u.active_users,
                u.target_users,
                format_duration(u.elapsed),
                format_rate(u.rps_now),
                format_rate(u.failed_rps_now),
                u.requests_total,
                u.failures_total,
                u.tasks_total,
            );
            progress.update(u.total_duration, u.elapsed, message);
        }))
    }

    fn print_summary(&self, summary: &txload_core::runner::RunSummary) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", render(summary));
        Ok(())
    }
}
