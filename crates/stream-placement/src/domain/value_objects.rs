//! # Domain Value Objects
//!
//! Immutable value types for stream placement.

use super::errors::{BlockNumber, NodeAddress, PlacementError, StreamId};
use super::entities::NodeStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stream-type tags carried in the leading byte of a [`StreamId`].
pub mod stream_type {
    /// Space stream.
    pub const SPACE: u8 = 0x10;
    /// Channel stream.
    pub const CHANNEL: u8 = 0x20;
    /// Group DM channel stream.
    pub const GDM_CHANNEL: u8 = 0x77;
    /// DM channel stream.
    pub const DM_CHANNEL: u8 = 0x88;
    /// User inbox stream.
    pub const USER_INBOX: u8 = 0xa1;
    /// User settings stream.
    pub const USER_SETTINGS: u8 = 0xa5;
    /// User stream.
    pub const USER: u8 = 0xa8;
    /// User metadata key stream.
    pub const USER_METADATA: u8 = 0xad;
    /// Media stream.
    pub const MEDIA: u8 = 0xff;
}

/// A request to place one stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacementRequest {
    /// Stream to place.
    pub stream_id: StreamId,
    /// Number of distinct nodes that must host it.
    pub replication_factor: usize,
}

impl PlacementRequest {
    /// Create a placement request.
    pub fn new(stream_id: StreamId, replication_factor: usize) -> Self {
        Self {
            stream_id,
            replication_factor,
        }
    }

    /// Reject non-positive replication factors.
    pub fn validate(&self) -> Result<(), PlacementError> {
        if self.replication_factor == 0 {
            return Err(PlacementError::InvalidReplicationFactor(
                self.replication_factor,
            ));
        }
        Ok(())
    }
}

/// Copy of per-node stream counts at one point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadSnapshot {
    counts: HashMap<NodeAddress, u64>,
}

impl LoadSnapshot {
    /// Wrap a count map.
    pub fn new(counts: HashMap<NodeAddress, u64>) -> Self {
        Self { counts }
    }

    /// Stream count for `node`; nodes never seen have load zero.
    pub fn load(&self, node: &NodeAddress) -> u64 {
        self.counts.get(node).copied().unwrap_or(0)
    }

    /// Iterate over tracked nodes and their counts.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeAddress, &u64)> {
        self.counts.iter()
    }

    /// Number of tracked nodes.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Check if no node is tracked.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Highest count, if any node is tracked.
    pub fn max_load(&self) -> Option<u64> {
        self.counts.values().copied().max()
    }

    /// Lowest count, if any node is tracked.
    pub fn min_load(&self) -> Option<u64> {
        self.counts.values().copied().min()
    }

    /// Underlying map.
    pub fn into_inner(self) -> HashMap<NodeAddress, u64> {
        self.counts
    }
}

impl From<HashMap<NodeAddress, u64>> for LoadSnapshot {
    fn from(counts: HashMap<NodeAddress, u64>) -> Self {
        Self::new(counts)
    }
}

/// Default extra candidates when the setting is absent from the on-chain config.
pub const DEFAULT_EXTRA_CANDIDATES_COUNT: u64 = 1;

/// Default minimum balancing advantage for required operators, in basis points.
pub const DEFAULT_MIN_BALANCING_ADVANTAGE_BPS: u64 = 500;

/// Default maximum balancing advantage for required operators, in basis points.
pub const DEFAULT_MAX_BALANCING_ADVANTAGE_BPS: u64 = 2000;

/// On-chain stream distribution settings.
///
/// Field names on the wire follow the registry's configuration keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDistributionSettings {
    /// Default replication factor for new streams.
    #[serde(rename = "stream.replicationFactor", default = "default_replication_factor")]
    pub replication_factor: u64,

    /// Nodes ranked beyond the replication factor that the chooser may pick
    /// from. Zero means pure consistent-hash placement.
    #[serde(
        rename = "stream.distribution.extracandidatescount",
        default = "default_extra_candidates_count"
    )]
    pub extra_candidates_count: u64,

    /// Operators of which at least one node must host every stream.
    #[serde(rename = "stream.distribution.requiredoperators", default)]
    pub required_operators: Vec<NodeAddress>,

    /// Load penalty for the least-loaded-but-one required node (basis points).
    /// Zero selects the default.
    #[serde(rename = "stream.distribution.minbalancingadvantage", default)]
    pub min_balancing_advantage_bps: u64,

    /// Load penalty for the most loaded required node (basis points).
    /// Zero selects the default.
    #[serde(rename = "stream.distribution.maxbalancingadvantage", default)]
    pub max_balancing_advantage_bps: u64,
}

fn default_replication_factor() -> u64 {
    1
}

fn default_extra_candidates_count() -> u64 {
    DEFAULT_EXTRA_CANDIDATES_COUNT
}

impl Default for StreamDistributionSettings {
    fn default() -> Self {
        Self {
            replication_factor: default_replication_factor(),
            extra_candidates_count: default_extra_candidates_count(),
            required_operators: Vec::new(),
            min_balancing_advantage_bps: 0,
            max_balancing_advantage_bps: 0,
        }
    }
}

impl StreamDistributionSettings {
    /// Settings with the given replication factor and extra candidates.
    pub fn new(replication_factor: u64, extra_candidates_count: u64) -> Self {
        Self {
            replication_factor,
            extra_candidates_count,
            ..Default::default()
        }
    }

    /// Set the required operators.
    pub fn with_required_operators(mut self, operators: Vec<NodeAddress>) -> Self {
        self.required_operators = operators;
        self
    }

    /// Balancing advantage range with defaults applied, as fractions.
    pub fn balancing_advantage(&self) -> (f64, f64) {
        let min_bps = match self.min_balancing_advantage_bps {
            0 => DEFAULT_MIN_BALANCING_ADVANTAGE_BPS,
            bps => bps,
        };
        let max_bps = match self.max_balancing_advantage_bps {
            0 => DEFAULT_MAX_BALANCING_ADVANTAGE_BPS,
            bps => bps,
        };
        (min_bps as f64 / 10_000.0, max_bps as f64 / 10_000.0)
    }
}

/// Membership change reported by the registry event feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    /// A node registered.
    NodeAdded {
        /// Registry height of the event
        block: BlockNumber,
        /// New node
        address: NodeAddress,
        /// Operator running it
        operator: NodeAddress,
        /// Initial status
        status: NodeStatus,
    },
    /// A node was removed from the registry.
    NodeRemoved {
        /// Registry height of the event
        block: BlockNumber,
        /// Removed node
        address: NodeAddress,
    },
    /// A node's status changed.
    NodeStatusUpdated {
        /// Registry height of the event
        block: BlockNumber,
        /// Affected node
        address: NodeAddress,
        /// New status
        status: NodeStatus,
    },
}

impl RegistryEvent {
    /// Node the event refers to.
    pub fn address(&self) -> NodeAddress {
        match self {
            Self::NodeAdded { address, .. }
            | Self::NodeRemoved { address, .. }
            | Self::NodeStatusUpdated { address, .. } => *address,
        }
    }

    /// Registry height of the event.
    pub fn block(&self) -> BlockNumber {
        match self {
            Self::NodeAdded { block, .. }
            | Self::NodeRemoved { block, .. }
            | Self::NodeStatusUpdated { block, .. } => *block,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NodeAdded { .. } => "node_added",
            Self::NodeRemoved { .. } => "node_removed",
            Self::NodeStatusUpdated { .. } => "node_status_updated",
        }
    }
}
