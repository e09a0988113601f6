use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use txload_core::transactions::ScriptVariant;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    humantime::parse_duration(s)
        .map_err(|err| format!("invalid duration '{s}': {err} (expected e.g. 10s, 250ms, 1m)"))
}

fn parse_variant(input: &str) -> Result<ScriptVariant, String> {
    input
        .parse()
        .map_err(|_| format!("unknown variant '{input}' (expected basic|extended)"))
}

fn parse_ratio(input: &str) -> Result<f64, String> {
    let v: f64 = input
        .trim()
        .parse()
        .map_err(|_| format!("invalid ratio '{input}' (expected a number in 0..=1)"))?;
    if !(0.0..=1.0).contains(&v) {
        return Err(format!("ratio '{input}' is out of range (expected 0..=1)"));
    }
    Ok(v)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable progress and summary.
    #[default]
    HumanReadable,
    /// Emit JSON progress lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "txload",
    author,
    version,
    about = "Load generator for the transactions REST API",
    long_about = "txload simulates concurrent users against a transactions REST API.\n\nEach user repeatedly picks a weighted random task (list, create, update, delete, get by id), remembers the ids it created, and targets its updates and deletes at them.",
    after_help = "Examples:\n  txload run --host http://127.0.0.1:8080 --users 10 --duration 30s\n  txload run --host http://127.0.0.1:8080 --variant basic --iterations 1000 --output json\n  txload run --config load.yaml --users 50"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a load test against a transactions API
    #[command(
        long_about = "Run simulated users against `--host`.\n\nCLI flags override values from `--config`, which override built-in defaults."
    )]
    Run(RunArgs),
}

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Base URL of the service under test (e.g. http://127.0.0.1:8080)
    #[arg(long, env = "TXLOAD_HOST")]
    pub host: Option<String>,

    /// Behavior variant: basic (v1) or extended (v2)
    #[arg(long, value_parser = parse_variant)]
    pub variant: Option<ScriptVariant>,

    /// Number of simulated users
    #[arg(long)]
    pub users: Option<u64>,

    /// Users started per second (default: all at once)
    #[arg(long)]
    pub spawn_rate: Option<f64>,

    /// Test duration (e.g. 10s, 250ms, 1m)
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Total task executions across all users
    #[arg(long)]
    pub iterations: Option<u64>,

    /// Minimum pause between two tasks of one user
    #[arg(long, value_parser = parse_duration)]
    pub wait_min: Option<Duration>,

    /// Maximum pause between two tasks of one user
    #[arg(long, value_parser = parse_duration)]
    pub wait_max: Option<Duration>,

    /// Page requested by the list task (default: 0 for basic, 1 for extended)
    #[arg(long)]
    pub page: Option<u32>,

    /// Page size requested by the list task
    #[arg(long)]
    pub size: Option<u32>,

    /// Extended variant: create first while fewer ids than this are known
    #[arg(long)]
    pub bootstrap_below: Option<usize>,

    #[arg(long)]
    pub weight_list: Option<u32>,

    #[arg(long)]
    pub weight_create: Option<u32>,

    #[arg(long)]
    pub weight_update: Option<u32>,

    #[arg(long)]
    pub weight_delete: Option<u32>,

    #[arg(long)]
    pub weight_get: Option<u32>,

    /// Seed for reproducible payloads and task picks
    #[arg(long)]
    pub seed: Option<u64>,

    /// Per-request timeout
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Exit with code 11 when failed/total requests exceeds this ratio
    #[arg(long, value_parser = parse_ratio)]
    pub max_failure_ratio: Option<f64>,

    /// YAML file with run settings
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,

    /// Log filter (e.g. warn, info, txload_core=debug)
    #[arg(long, env = "TXLOAD_LOG", default_value = "warn")]
    pub log_level: String,
}
