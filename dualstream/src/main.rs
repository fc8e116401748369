//! dualstream main binary
//!
//! Command-line driver for the monitor:
//! - monitor: run one monitoring cycle over a reference and current batch
//! - audit-dual: audit answer / reasoning-trace pairs and write a report
//! - guard: print an ALLOW/BLOCK decision per record
//! - state: inspect persisted monitor state

mod io;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dualstream_core::prelude::*;
use dualstream_detection::coherence::{CoherenceAuditor, CoherencePolicy, MarkerVocabulary};
use dualstream_monitor::prelude::*;
use dualstream_storage::prelude::*;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Name of the coherence report written by `audit-dual`
const COHERENCE_REPORT_FILE: &str = "coherence_report.json";

/// dualstream CLI arguments
#[derive(Debug, Parser)]
#[clap(name = "dualstream", version, about = "Model degradation and dual-stream coherence monitor")]
struct Cli {
    /// Configuration file path (YAML)
    #[clap(short, long, env = "DUALSTREAM_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[clap(long, env = "DUALSTREAM_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Enable JSON logging
    #[clap(long, env = "DUALSTREAM_LOG_JSON", global = true)]
    log_json: bool,

    /// Artifacts directory (state, baseline, reports)
    #[clap(long, global = true)]
    artifacts: Option<PathBuf>,

    /// Target (label) column
    #[clap(long, global = true)]
    target: Option<String>,

    /// Row identifier column
    #[clap(long, global = true)]
    id_column: Option<String>,

    /// Comma-separated feature columns
    #[clap(long, value_delimiter = ',', global = true)]
    features: Option<Vec<String>>,

    /// Alert sink (stdout, file)
    #[clap(long, env = "DUALSTREAM_ALERT_SINK", global = true)]
    alert_sink: Option<String>,

    /// Subcommand to execute
    #[clap(subcommand)]
    command: Commands,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one monitoring cycle and print the report as JSON
    Monitor {
        /// Reference batch (JSON array of rows or JSONL)
        #[clap(long)]
        reference: PathBuf,

        /// Current batch (JSON array of rows or JSONL)
        #[clap(long)]
        current: PathBuf,

        /// Evaluation metrics of the current batch (JSON object)
        #[clap(long)]
        metrics: Option<PathBuf>,

        /// Per-sample losses for concept drift (JSON array)
        #[clap(long)]
        losses: Option<PathBuf>,

        /// Answer / reasoning-trace records to audit in the same cycle (JSONL)
        #[clap(long)]
        dual_jsonl: Option<PathBuf>,
    },
    /// Audit answer / reasoning-trace records and write a coherence report
    AuditDual {
        /// JSONL with {answer, monologue, logits_topk?}
        #[clap(long)]
        dual_jsonl: PathBuf,
    },
    /// Print an ALLOW/BLOCK decision for each record
    Guard {
        /// JSONL with {answer, monologue, logits_topk?}
        path: PathBuf,
    },
    /// Show persisted monitor state
    State {
        /// Output as JSON
        #[clap(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    info!("Starting dualstream v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Monitor {
            reference,
            current,
            metrics,
            losses,
            dual_jsonl,
        } => run_monitor_command(config, &reference, &current, metrics, losses, dual_jsonl),
        Commands::AuditDual { dual_jsonl } => run_audit_command(config, &dual_jsonl),
        Commands::Guard { path } => run_guard_command(&config, &path),
        Commands::State { json } => run_state_command(&config, json),
    }
}

/// Build the monitor configuration from the optional file plus CLI overrides
fn load_config(cli: &Cli) -> Result<MonitorConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            MonitorConfig::from_file(path).context("Failed to load configuration")?
        }
        None => MonitorConfig::new("y"),
    };

    if let Some(target) = &cli.target {
        config.target = target.clone();
    }
    if let Some(id_column) = &cli.id_column {
        config.id_column = Some(id_column.clone());
    }
    if let Some(features) = &cli.features {
        config.features = Some(features.clone());
    }
    if let Some(artifacts) = &cli.artifacts {
        config.output_dir = artifacts.clone();
    }
    if let Some(sink) = &cli.alert_sink {
        config.alert_sink = sink.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Run the monitor subcommand
fn run_monitor_command(
    config: MonitorConfig,
    reference: &Path,
    current: &Path,
    metrics: Option<PathBuf>,
    losses: Option<PathBuf>,
    dual_jsonl: Option<PathBuf>,
) -> Result<()> {
    let baseline = read_baseline_or_default(config.baseline_path())?;
    let mut monitor = Monitor::open(config, baseline).context("Failed to create monitor")?;

    let reference = io::read_batch(reference)?;
    let current = io::read_batch(current)?;
    let metrics = metrics.map(io::read_metrics).transpose()?;
    let losses = losses.map(io::read_losses).transpose()?;
    let records = dual_jsonl.map(io::read_records).transpose()?;

    let mut input = CycleInput::new().with_batches(&reference, &current);
    if let Some(metrics) = &metrics {
        input = input.with_metrics(metrics);
    }
    if let Some(losses) = &losses {
        input = input.with_losses(losses);
    }
    if let Some(records) = &records {
        input = input.with_records(records);
    }

    let report = monitor.run_cycle(input)?;
    info!(
        batch = report.batch,
        retrain_recommended = report.retrain_recommended(),
        coherence_violations = report.coherence_violations(),
        "Monitoring cycle complete"
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Run the audit-dual subcommand
fn run_audit_command(config: MonitorConfig, dual_jsonl: &Path) -> Result<()> {
    let report_path = config.output_dir.join(COHERENCE_REPORT_FILE);
    let monitor = Monitor::open(config, Baseline::default()).context("Failed to create monitor")?;

    let records = io::read_records(dual_jsonl)?;
    let results = monitor.audit_dual_streams(&records)?;
    io::write_json(&report_path, &results)?;

    let violations = results.iter().filter(|r| !r.coherent).count();
    info!(records = results.len(), violations, "Audit complete");

    println!(
        "{}",
        json!({"report": report_path.display().to_string(), "violations": violations})
    );
    Ok(())
}

/// Run the guard subcommand. Needs no state, so no monitor is built.
fn run_guard_command(config: &MonitorConfig, path: &Path) -> Result<()> {
    let auditor = CoherenceAuditor::new(
        CoherencePolicy::from(&config.thresholds),
        MarkerVocabulary::default(),
    );

    for record in io::read_records(path)? {
        let result = auditor.audit_record(&record);
        println!(
            "{}",
            json!({
                "decision": result.decision(),
                "reasons": result.reasons,
                "answer": record.answer,
            })
        );
    }
    Ok(())
}

/// Run the state subcommand
fn run_state_command(config: &MonitorConfig, json_output: bool) -> Result<()> {
    let store = JsonFileStore::new(config.state_path());
    let Some(state) = store.load()? else {
        println!("No monitor state at {}", config.state_path().display());
        return Ok(());
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!("\n{}", "=".repeat(70));
    println!("MONITOR STATE");
    println!("{}", "=".repeat(70));
    println!("Path:               {}", config.state_path().display());
    println!("Batches seen:       {}", state.batches_seen);
    println!(
        "Last retrain:       {}",
        state
            .last_retrain_batch
            .map(|b| format!("batch {}", b))
            .unwrap_or_else(|| "never".to_string())
    );
    println!("Events:             {}", state.events().len());
    println!();

    if !state.events().is_empty() {
        println!("{:<8} {:<22} {:<30}", "Batch", "Type", "Recorded");
        println!("{}", "-".repeat(70));
        for event in state.events() {
            let batch = event
                .batch
                .map(|b| b.to_string())
                .unwrap_or_else(|| "-".to_string());
            let recorded = event
                .recorded_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("{:<8} {:<22} {:<30}", batch, event.detail.type_tag(), recorded);
        }
        println!("{}", "=".repeat(70));
    }

    Ok(())
}

/// Initialize logging
fn init_logging(cli: &Cli) -> Result<()> {
    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .context("Invalid log level")?;

    // Logs go to stderr so stdout stays machine-readable
    if cli.log_json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .with(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(log_level.into()),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_line_number(true),
            )
            .with(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(log_level.into()),
            )
            .init();
    }

    info!("Logging initialized at level: {}", log_level);

    Ok(())
}
