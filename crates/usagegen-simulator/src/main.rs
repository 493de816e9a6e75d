//! CLI entry point for the usage generator.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use usagegen_simulator::{
    config::{GeneratorConfig, SinkKind},
    report::RunReport,
    run_workload, LineProtocolSink, TickProgress,
};
use usagegen_storage::MemorySink;

#[derive(Parser)]
#[command(name = "usagegen")]
#[command(about = "Seeds a time series store with synthetic workspace/branch usage")]
#[command(version)]
struct Cli {
    /// Configuration file (YAML); defaults apply when it does not exist
    #[arg(short, long, default_value = "usagegen.yml")]
    config: PathBuf,

    /// First tick, e.g. "2023-03-01 00:00:00" (UTC) or RFC 3339
    #[arg(long)]
    start: Option<String>,

    /// End of the window (exclusive)
    #[arg(long)]
    end: Option<String>,

    /// Tick interval, e.g. "5m"
    #[arg(long)]
    step: Option<String>,

    /// Number of workspaces
    #[arg(short, long)]
    workspaces: Option<usize>,

    /// Number of branches
    #[arg(short, long)]
    branches: Option<usize>,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Sink receiving the batches
    #[arg(long, value_enum)]
    sink: Option<SinkKind>,

    /// Server URL for the http sink
    #[arg(short, long)]
    server: Option<String>,

    /// Output file for the JSON report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    fn apply(&self, config: &mut GeneratorConfig) {
        if let Some(start) = &self.start {
            config.start = start.clone();
        }
        if let Some(end) = &self.end {
            config.end = end.clone();
        }
        if let Some(step) = &self.step {
            config.step = step.clone();
        }
        if let Some(workspaces) = self.workspaces {
            config.workspace_count = workspaces;
        }
        if let Some(branches) = self.branches {
            config.branch_count = branches;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(sink) = self.sink {
            config.sink.kind = sink;
        }
        if let Some(server) = &self.server {
            config.sink.server_url = server.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = GeneratorConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    cli.apply(&mut config);

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid logging level")?;
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    config.validate().context("Invalid configuration")?;
    let ticks = config.time_window()?.len();

    let progress = if cli.no_progress {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(ticks as u64)
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ticks ({eta}) {msg}")?
            .progress_chars("=> "),
    );
    let on_tick = |tick: &TickProgress| {
        progress.set_position(tick.index as u64 + 1);
    };

    info!(
        sink = %config.sink.kind,
        start = %config.start,
        end = %config.end,
        step = %config.step,
        "Starting usage generator"
    );

    let sink_name = config.sink.kind.to_string();
    let report: RunReport = match config.sink.kind {
        SinkKind::Memory => {
            let schema = config.table_schema()?;
            let mut sink = MemorySink::new(schema.clone());
            let catalog = sink.catalog();

            let mut report = run_workload(&config, &sink_name, &mut sink, on_tick).await?;
            report.table = catalog.stats(&schema.name);
            report
        }
        SinkKind::Http => {
            let mut sink = LineProtocolSink::new(
                &config.sink.server_url,
                &config.table.name,
                config.sink.timeout(),
            )?;

            let report = run_workload(&config, &sink_name, &mut sink, on_tick).await?;
            let stats = sink.stats();
            info!(
                batches = stats.batches,
                points = stats.points,
                bytes = stats.bytes,
                "Wrote line protocol"
            );
            report
        }
    };
    progress.finish_and_clear();

    report.print_summary();

    if let Some(path) = &cli.output {
        std::fs::write(path, report.to_json())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("JSON report saved to: {}", path.display());
    }

    Ok(())
}
