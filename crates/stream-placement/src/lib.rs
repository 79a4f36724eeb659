//! # Stream Placement
//!
//! Load-balanced, coordinator-free stream-to-node distribution.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Every stream is hosted by exactly `replication_factor` distinct operational
//! nodes. Any node can compute the placement from public registry state:
//! - Rendezvous-style ranking by `blake3(stream_id || node_address)`
//! - A bounded pool of extra candidates lets the least loaded nodes win
//! - Operator diversity and required operators shape the pool
//! - New nodes start at zero load and catch up without mass rebalancing
//!
//! ## Concurrency
//!
//! | State | Guard | Readers see |
//! |-------|-------|-------------|
//! | Operational node set | `RwLock<Arc<NodeSet>>`, swapped whole | old or new set, never a mix |
//! | Per-node loads | one `Mutex`, held for select + increment | no lost increments |
//!
//! ## Module Structure
//!
//! ```text
//! stream-placement/
//! ├── domain/          # Identifiers, node state machine, settings, invariants
//! ├── algorithms/      # Candidate ranking, placement chooser
//! ├── ports/           # StreamDistributor, DistributorSimulator, NodeRegistry, OnChainConfig
//! ├── adapters/        # Membership view, load tracker, in-memory registry, static config
//! ├── service.rs       # StreamsDistributor
//! └── tasks.rs         # Feed watcher, periodic reseed
//! ```
//!
//! ## Features
//!
//! - `metrics`: Prometheus counters and gauges
//! - `simulation`: the `DistributorSimulator` port for load simulations

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;
pub mod tasks;

// Re-exports
pub use adapters::{InMemoryNodeRegistry, LoadTracker, MembershipView, StaticOnChainConfig};
pub use algorithms::{
    choose_nodes, node_score, plan_candidates, rank_nodes, ranked_placement, select_candidates,
    CandidatePlan, Placement, RankedNode,
};
pub use config::DistributorConfig;
pub use domain::{
    invariant_balanced_load, invariant_monotonic_load, invariant_valid_placement, stream_type,
    BlockNumber, IdentifierError, InvariantViolation, LoadSnapshot, MembershipError, NodeAddress,
    NodeRecord, NodeSet, NodeStatus, PlacementError, PlacementRequest, RegistryError,
    RegistryEvent, StreamDistributionSettings, StreamId, DEFAULT_EXTRA_CANDIDATES_COUNT,
    MAX_LOAD_SKEW_PERCENT,
};
#[cfg(any(test, feature = "simulation"))]
pub use ports::DistributorSimulator;
pub use ports::{NodeRegistry, OnChainConfig, RegistryEventStream, StreamDistributor};
pub use service::StreamsDistributor;
pub use tasks::{start, DistributorTasks};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
