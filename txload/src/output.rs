use crate::cli::OutputFormat;
use crate::config_file::ResolvedRun;

mod human;
mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, run: &ResolvedRun);
    fn progress(&self) -> Option<txload_core::runner::ProgressFn>;
    fn print_summary(&self, summary: &txload_core::runner::RunSummary) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
