//! mdlogistics - headless container/hopper scenario runner

use anyhow::{Context, Result};
use clap::Parser;
use mdlogistics::Scenario;
use mdlogistics_core::BlockPos;
use mdlogistics_testkit::{
    JsonlSink, MetricsReportBuilder, MetricsSink, PersistenceMetrics, TestResult,
};
use mdlogistics_world::{save_snapshot, TransferConfig, World};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a container/hopper scenario headlessly", long_about = None)]
struct Args {
    /// Scenario file (TOML)
    scenario: PathBuf,
    /// Override the scenario's tick count
    #[arg(long)]
    ticks: Option<u64>,
    /// Transfer config (TOML); replaces the scenario's [config] table
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write every world event as newline-delimited JSON
    #[arg(long)]
    events: Option<PathBuf>,
    /// Write a metrics report (JSON)
    #[arg(long)]
    metrics: Option<PathBuf>,
    /// Save a snapshot of the final world
    #[arg(long)]
    save: Option<PathBuf>,
    /// Exit with an error when tracked item totals change
    #[arg(long)]
    check_conservation: bool,
}

/// Final contents of one container, printed on stdout.
#[derive(Debug, Serialize)]
struct ContainerSummary {
    pos: BlockPos,
    kind: &'static str,
    slots: Vec<SlotSummary>,
}

#[derive(Debug, Serialize)]
struct SlotSummary {
    slot: usize,
    item: String,
    count: u16,
}

fn summarize(world: &World) -> Vec<ContainerSummary> {
    world
        .block_entities()
        .map(|(pos, be)| ContainerSummary {
            pos,
            kind: be.type_id(),
            slots: be
                .inventory()
                .raw_slots()
                .iter()
                .enumerate()
                .filter_map(|(slot, stack)| stack.as_ref().map(|stack| (slot, stack)))
                .map(|(slot, stack)| SlotSummary {
                    slot,
                    item: stack.item.to_string(),
                    count: stack.count,
                })
                .collect(),
        })
        .collect()
}

fn main() -> Result<()> {
    // WARN by default; RUST_LOG overrides.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    info!("Starting mdlogistics v{}", env!("CARGO_PKG_VERSION"));

    let scenario = Scenario::load(&args.scenario)?;
    let config = args
        .config
        .as_deref()
        .map(TransferConfig::load_from_path);
    let mut world = scenario.build(config)?;
    let ticks = args.ticks.unwrap_or(scenario.ticks);

    let mut sink = args.events.as_ref().map(JsonlSink::create).transpose()?;
    let metrics = scenario.run(&mut world, ticks, sink.as_mut())?;
    if let Some(sink) = sink.as_mut() {
        sink.flush()?;
        info!(lines = sink.lines(), "Wrote event log");
    }

    let conserved = metrics.conserved();
    if !conserved {
        warn!(
            before = ?metrics.totals_before,
            after = ?metrics.totals_after,
            "Tracked item totals changed"
        );
    }

    let mut persistence = None;
    if let Some(path) = &args.save {
        save_snapshot(&world, path)?;
        let snapshot_bytes = std::fs::metadata(path)
            .with_context(|| format!("Failed to stat snapshot {}", path.display()))?
            .len();
        persistence = Some(PersistenceMetrics {
            snapshot_bytes,
            blocks: world.blocks().count() as u64,
            entities: world.entities().count() as u64,
        });
        info!(path = %path.display(), "Saved snapshot");
    }

    if let Some(path) = &args.metrics {
        let name = if scenario.name.is_empty() {
            args.scenario.display().to_string()
        } else {
            scenario.name.clone()
        };
        let result = if args.check_conservation && !conserved {
            TestResult::Fail
        } else {
            TestResult::Pass
        };
        let mut report = MetricsReportBuilder::new(name)
            .result(result)
            .transfers(metrics.clone());
        if let Some(persistence) = persistence {
            report = report.persistence(persistence);
        }
        MetricsSink::create(path)?.write(&report.build())?;
    }

    let summary = serde_json::to_string_pretty(&summarize(&world))
        .context("Failed to format summary")?;
    println!("{summary}");

    if args.check_conservation && !conserved {
        anyhow::bail!("item totals changed during the run");
    }
    Ok(())
}
