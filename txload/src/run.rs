use std::sync::Arc;

use anyhow::Context as _;

use txload_core::runner;
use txload_core::transactions::TransactionsBehavior;

use crate::cli::RunArgs;
use crate::config_file::{self, FileConfig, ResolvedRun};
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let resolved = resolve(&args).await.map_err(RunError::InvalidInput)?;
    resolved.run.validate()?;

    let out = output::formatter(args.output);
    out.print_header(&resolved);

    if !resolved.run.is_bounded() {
        tracing::warn!("neither duration nor iterations set; running until interrupted");
    }

    let behavior = Arc::new(TransactionsBehavior::new(resolved.driver.clone()));
    let summary = runner::run_users(behavior, resolved.run.clone(), out.progress()).await?;

    out.print_summary(&summary)
        .context("failed to write summary")
        .map_err(RunError::RuntimeError)?;

    let ratio = summary.failure_ratio();
    let code = ExitCode::from_failure_ratio(ratio, resolved.max_failure_ratio);
    if code == ExitCode::FailureRatioExceeded {
        eprintln!(
            "failure ratio {ratio:.4} exceeded --max-failure-ratio {}",
            resolved.max_failure_ratio.unwrap_or_default()
        );
    }
    Ok(code)
}

async fn resolve(args: &RunArgs) -> anyhow::Result<ResolvedRun> {
    let file = match &args.config {
        Some(path) => FileConfig::load(path).await?,
        None => FileConfig::default(),
    };
    config_file::resolve(args, file)
}
