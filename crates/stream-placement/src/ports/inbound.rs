//! # Inbound Ports
//!
//! What the placement subsystem offers to the rest of the node.

use crate::domain::{NodeAddress, PlacementError, StreamId};
use async_trait::async_trait;

#[cfg(any(test, feature = "simulation"))]
use crate::domain::LoadSnapshot;
#[cfg(any(test, feature = "simulation"))]
use std::collections::HashMap;

/// Stream distributor - inbound port.
///
/// Chooses the nodes that will host a new stream. The decision is speculative:
/// the caller commits it to the registry, and the local load count is bumped
/// whether or not that commit succeeds.
#[async_trait]
pub trait StreamDistributor: Send + Sync {
    /// Choose exactly `replication_factor` distinct operational nodes for
    /// `stream_id` and record one more stream on each of them.
    ///
    /// Fails without changing any load when the factor is zero or fewer
    /// operational nodes exist than requested.
    async fn choose_stream_nodes(
        &self,
        stream_id: &StreamId,
        replication_factor: usize,
    ) -> Result<Vec<NodeAddress>, PlacementError>;
}

/// Simulation extension of [`StreamDistributor`].
///
/// Lets a test harness inject load and synthetic nodes without a registry.
/// Only compiled for unit tests and with the `simulation` feature.
#[cfg(any(test, feature = "simulation"))]
pub trait DistributorSimulator: StreamDistributor {
    /// Copy of the current per-node stream counts.
    fn node_stream_count(&self) -> LoadSnapshot;

    /// Stream count for one node.
    fn node_stream_load(&self, node: &NodeAddress) -> Result<u64, PlacementError>;

    /// Record one more stream on `node`.
    fn assign_stream_to_node(&self, node: &NodeAddress) -> Result<(), PlacementError>;

    /// Overwrite the stream counts of the given operational nodes. Counts of
    /// nodes absent from `load` are kept; unknown nodes are ignored.
    fn set_node_stream_load(&self, load: HashMap<NodeAddress, u64>);

    /// Add an operational node with zero load.
    fn add_new_node(&self, address: NodeAddress, operator: NodeAddress);
}
