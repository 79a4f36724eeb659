//! Stream placement balance simulator.
//!
//! Places a long run of synthetic streams on an in-memory cluster and records
//! how per-node load evolves, optionally with nodes joining mid-run.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;
use stream_placement::{
    stream_type, DistributorConfig, DistributorSimulator, InMemoryNodeRegistry, LoadSnapshot,
    NodeAddress, NodeRecord, PlacementError, StaticOnChainConfig, StreamDistributionSettings,
    StreamDistributor, StreamId, StreamsDistributor, MAX_LOAD_SKEW_PERCENT,
};
use thiserror::Error;
use tracing::info;

/// Simulation input.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationParams {
    /// Nodes present from the start.
    pub nodes: usize,
    /// Distinct operators; nodes are assigned round-robin.
    pub operators: usize,
    /// Replicas per stream.
    pub replication_factor: usize,
    /// Extra candidates beyond the replication factor.
    pub extra_candidates: u64,
    /// Streams to place.
    pub streams: u64,
    /// Emit a progress row every this many streams.
    pub report_every: u64,
    /// Stream indexes at which one new zero-load node joins.
    pub join_at: BTreeSet<u64>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            nodes: 25,
            operators: 25,
            replication_factor: 3,
            extra_candidates: 0,
            streams: 1_000_000,
            report_every: 100_000,
            join_at: BTreeSet::new(),
        }
    }
}

/// Rejected simulation input.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Parameters cannot describe a valid run.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// A placement failed mid-run.
    #[error("Placement failed at stream {index}: {source}")]
    Placement {
        /// Stream index
        index: u64,
        /// Underlying error
        source: PlacementError,
    },
}

impl SimulationParams {
    /// Check parameter consistency.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.nodes == 0 || self.operators == 0 {
            return Err(SimulationError::InvalidParams(
                "nodes and operators must be positive".to_string(),
            ));
        }
        if self.replication_factor == 0 || self.replication_factor > self.nodes {
            return Err(SimulationError::InvalidParams(format!(
                "replication factor {} must be between 1 and {} nodes",
                self.replication_factor, self.nodes
            )));
        }
        if self.report_every == 0 {
            return Err(SimulationError::InvalidParams(
                "report interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load statistics at one point of the run.
#[derive(Clone, Debug, Serialize)]
pub struct ProgressRow {
    /// Streams placed so far.
    pub streams: u64,
    /// Lowest node load.
    pub min: u64,
    /// Highest node load.
    pub max: u64,
    /// `(max - min) / min` in percent.
    pub skew_percent: f64,
    /// Load of the most recently joined node, if any joined.
    pub newest_node: Option<u64>,
}

/// Outcome of a simulation.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    /// Input parameters.
    pub params: SimulationParams,
    /// Progress rows in order.
    pub rows: Vec<ProgressRow>,
    /// Final per-node loads, sorted by address.
    pub final_loads: Vec<(String, u64)>,
    /// Whether the final loads are within the balance bound.
    pub balanced: bool,
}

impl SimulationReport {
    /// Write progress rows as CSV.
    pub fn write_csv<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        writeln!(out, "streams,min,max,skew_percent,newest_node")?;
        for row in &self.rows {
            let newest = row.newest_node.map(|n| n.to_string()).unwrap_or_default();
            writeln!(
                out,
                "{},{},{},{:.3},{}",
                row.streams, row.min, row.max, row.skew_percent, newest
            )?;
        }
        Ok(())
    }

    /// Human-readable balance summary.
    pub fn summary(&self) -> String {
        let last = self.rows.last();
        format!(
            "nodes={} streams={} min={} max={} skew={:.3}% balanced={}",
            self.final_loads.len(),
            self.params.streams,
            last.map(|r| r.min).unwrap_or(0),
            last.map(|r| r.max).unwrap_or(0),
            last.map(|r| r.skew_percent).unwrap_or(0.0),
            self.balanced
        )
    }
}

/// Deterministic node address for index `i`.
pub fn node_address(i: u64) -> NodeAddress {
    derive_address(b"node", i)
}

/// Deterministic operator address for index `i`.
pub fn operator_address(i: u64) -> NodeAddress {
    derive_address(b"operator", i)
}

fn derive_address(domain: &[u8], i: u64) -> NodeAddress {
    let digest = Sha256::new()
        .chain_update(domain)
        .chain_update(i.to_be_bytes())
        .finalize();
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[..20]);
    NodeAddress::new(bytes)
}

/// Chain of channel stream ids: each is `sha256(previous)` with the leading
/// byte replaced by the channel tag, starting from the all-zero id.
pub struct StreamIdChain {
    current: [u8; 32],
}

impl StreamIdChain {
    /// Start from the all-zero id.
    pub fn new() -> Self {
        Self { current: [0u8; 32] }
    }
}

impl Default for StreamIdChain {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for StreamIdChain {
    type Item = StreamId;

    fn next(&mut self) -> Option<StreamId> {
        let mut next: [u8; 32] = Sha256::digest(self.current).into();
        next[0] = stream_type::CHANNEL;
        self.current = next;
        Some(StreamId::new(next))
    }
}

fn progress_row(streams: u64, snapshot: &LoadSnapshot, newest: Option<NodeAddress>) -> ProgressRow {
    let min = snapshot.min_load().unwrap_or(0);
    let max = snapshot.max_load().unwrap_or(0);
    let skew_percent = if min == 0 {
        if max == 0 {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        (max - min) as f64 * 100.0 / min as f64
    };
    ProgressRow {
        streams,
        min,
        max,
        skew_percent,
        newest_node: newest.map(|n| snapshot.load(&n)),
    }
}

/// Run a simulation.
pub async fn run_simulation(params: SimulationParams) -> Result<SimulationReport, SimulationError> {
    params.validate()?;

    let operators = params.operators as u64;
    let records = (0..params.nodes as u64)
        .map(|i| NodeRecord::operational(node_address(i), operator_address(i % operators)));
    let registry = Arc::new(InMemoryNodeRegistry::with_nodes(records));
    let settings = StreamDistributionSettings::new(
        params.replication_factor as u64,
        params.extra_candidates,
    );
    let distributor = StreamsDistributor::new(
        registry,
        Arc::new(StaticOnChainConfig::new(settings)),
        DistributorConfig::cold(),
    );
    distributor
        .bootstrap()
        .await
        .map_err(|source| SimulationError::Placement { index: 0, source })?;

    info!(
        nodes = params.nodes,
        operators = params.operators,
        replication_factor = params.replication_factor,
        extra_candidates = params.extra_candidates,
        streams = params.streams,
        "Simulation started"
    );

    let mut rows = Vec::new();
    let mut next_node = params.nodes as u64;
    let mut newest = None;

    for (index, stream_id) in (0..params.streams).zip(StreamIdChain::new()) {
        if params.join_at.contains(&index) {
            let address = node_address(next_node);
            distributor.add_new_node(address, operator_address(next_node % operators));
            info!(index, node = %address, "Node joined");
            newest = Some(address);
            next_node += 1;
        }

        distributor
            .choose_stream_nodes(&stream_id, params.replication_factor)
            .await
            .map_err(|source| SimulationError::Placement { index, source })?;

        let placed = index + 1;
        if placed % params.report_every == 0 || placed == params.streams {
            rows.push(progress_row(placed, &distributor.node_stream_count(), newest));
        }
    }

    let snapshot = distributor.node_stream_count();
    let nodes: Vec<NodeAddress> = distributor.current_operational_nodes().addresses().collect();
    let balanced =
        stream_placement::invariant_balanced_load(&snapshot, &nodes, MAX_LOAD_SKEW_PERCENT);
    let final_loads = nodes
        .iter()
        .map(|n| (n.to_string(), snapshot.load(n)))
        .collect();

    Ok(SimulationReport {
        params,
        rows,
        final_loads,
        balanced,
    })
}
