use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

fn parse_interval(input: &str) -> Result<std::time::Duration, String> {
    match loadphase_core::duration::parse_duration_secs(input) {
        0 => Err(format!("`{input}` is not a whole number of seconds (e.g. 1s, 10s, 1m)")),
        secs => Ok(std::time::Duration::from_secs(secs)),
    }
}

fn parse_start_time(input: &str) -> Result<DateTime<Utc>, String> {
    loadphase_core::ingest::parse_timestamp(input.trim()).map_err(|e| e.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned text tables.
    HumanReadable,
    /// One JSON document with every table.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "loadphase",
    author,
    version,
    about = "Phase-aware latency and SLA reports for load tests",
    long_about = "loadphase aggregates per-request results of a load test into per-api, per-scenario and per-phase latency tables and checks them against SLA thresholds.\n\nA test plan (YAML or JSON) lists the apis under test, the scenarios with their ramp phases, and optional SLA thresholds.",
    after_help = "Examples:\n  loadphase plan plan.yaml\n  loadphase report results.ndjson --plan plan.yaml\n  loadphase report results.ndjson --plan plan.yaml --sla sla.json --html out/report.html\n  loadphase report results.ndjson --plan plan.yaml --output json"
)]
pub struct Cli {
    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Aggregate k6 NDJSON results into an SLA report
    #[command(
        long_about = "Replay `k6 run --out json=...` results through the metrics engine and print the report.\n\nExits with 11 when any api breaches its p90 SLA in the overall table."
    )]
    Report(ReportArgs),

    /// Validate a test plan and print its phase timeline
    Plan(PlanArgs),
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Path to the k6 NDJSON results file
    pub results: PathBuf,

    /// Test plan (apis, scenarios, phases, optional sla)
    #[arg(long)]
    pub plan: PathBuf,

    /// SLA file (JSON or YAML); replaces the plan's `sla` section
    #[arg(long)]
    pub sla: Option<PathBuf>,

    /// Also write a self-contained HTML report to this path
    #[arg(long, value_name = "PATH")]
    pub html: Option<PathBuf>,

    /// Application name shown in the report header
    #[arg(long, env = "LOADPHASE_APP_NAME")]
    pub app_name: Option<String>,

    /// Run name shown in the report header
    #[arg(long, env = "LOADPHASE_RUN_NAME")]
    pub run_name: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,

    /// Disable ANSI colours in the text report
    #[arg(long)]
    pub no_color: bool,

    /// Test start (RFC 3339); defaults to the earliest point in the results
    #[arg(long, value_parser = parse_start_time)]
    pub start_time: Option<DateTime<Utc>>,

    /// Take the api list from the results file when the plan lists none
    #[arg(long)]
    pub discover_apis: bool,

    /// Bucket width of the per-api timeline (e.g. 1s, 10s, 1m)
    #[arg(long, value_parser = parse_interval, default_value = "10s")]
    pub interval: std::time::Duration,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Path to the test plan
    pub file: PathBuf,
}
