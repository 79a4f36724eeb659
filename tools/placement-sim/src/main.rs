//! placement-sim: stream placement balance simulator
//!
//! Prints a CSV load progression to stdout and a balance summary to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use placement_sim::{run_simulation, SimulationParams};
use placement_telemetry::{init_telemetry, TelemetryConfig};
use std::collections::BTreeSet;
use std::io;

/// placement-sim: simulate stream placement over an in-memory cluster
#[derive(Parser, Debug)]
#[command(name = "placement-sim")]
#[command(about = "Simulate load-balanced stream placement")]
struct Args {
    /// Initial number of nodes
    #[arg(short, long, default_value = "25")]
    nodes: usize,

    /// Number of distinct operators (defaults to one per node)
    #[arg(short, long)]
    operators: Option<usize>,

    /// Replication factor
    #[arg(short, long, default_value = "3")]
    replication_factor: usize,

    /// Extra candidates beyond the replication factor
    #[arg(short, long, default_value = "0")]
    extra_candidates: u64,

    /// Number of streams to place
    #[arg(short, long, default_value = "1000000")]
    streams: u64,

    /// Progress row interval
    #[arg(long, default_value = "100000")]
    report_every: u64,

    /// Stream index at which a new node joins (repeatable)
    #[arg(long = "join-at")]
    join_at: Vec<u64>,

    /// Print the full report as JSON instead of CSV
    #[arg(long)]
    json: bool,

    /// Dump Prometheus metrics after the run
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_telemetry(&TelemetryConfig::for_service("placement-sim"))
        .context("failed to initialize logging")?;

    let params = SimulationParams {
        nodes: args.nodes,
        operators: args.operators.unwrap_or(args.nodes),
        replication_factor: args.replication_factor,
        extra_candidates: args.extra_candidates,
        streams: args.streams,
        report_every: args.report_every,
        join_at: args.join_at.into_iter().collect::<BTreeSet<_>>(),
    };

    let report = run_simulation(params).await.context("simulation failed")?;

    if args.json {
        serde_json::to_writer_pretty(io::stdout().lock(), &report)
            .context("failed to write report")?;
        println!();
    } else {
        report
            .write_csv(io::stdout().lock())
            .context("failed to write CSV")?;
    }
    eprintln!("{}", report.summary());

    if args.metrics {
        let text = placement_telemetry::encode_metrics().context("failed to encode metrics")?;
        print!("{}", text);
    }

    Ok(())
}
