//! # Domain Entities
//!
//! Node records, the node state machine and the operational node set.

use super::errors::{MembershipError, NodeAddress};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Registry-reported node status.
///
/// ```text
/// (unknown) ──► Registered ──► Operational ──► NonOperational
///                   │                               │
///                   └──────────► NonOperational ◄───┘
///                                     │
///                                     └──► Registered  (fresh registration)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    /// Registered but not yet accepting streams.
    Registered,
    /// Eligible for new placements.
    Operational,
    /// Removed, failed or departing. Never eligible for placement.
    NonOperational,
}

impl NodeStatus {
    /// Check if transition to `next` is legal.
    pub fn can_transition_to(&self, next: NodeStatus) -> bool {
        matches!(
            (self, next),
            (Self::Registered, Self::Operational)
                | (Self::Registered, Self::NonOperational)
                | (Self::Operational, Self::NonOperational)
                | (Self::NonOperational, Self::Registered)
        )
    }

    /// Check if the node may receive placements.
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::Operational)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Registered => "Registered",
            Self::Operational => "Operational",
            Self::NonOperational => "NonOperational",
        };
        f.write_str(name)
    }
}

/// A node as reported by the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node identity.
    pub address: NodeAddress,
    /// Operator that runs the node.
    pub operator: NodeAddress,
    /// Current status.
    pub status: NodeStatus,
}

impl NodeRecord {
    /// Create a node record.
    pub fn new(address: NodeAddress, operator: NodeAddress, status: NodeStatus) -> Self {
        Self {
            address,
            operator,
            status,
        }
    }

    /// Shorthand for an operational node record.
    pub fn operational(address: NodeAddress, operator: NodeAddress) -> Self {
        Self::new(address, operator, NodeStatus::Operational)
    }

    /// Check if the node may receive placements.
    pub fn is_operational(&self) -> bool {
        self.status.is_operational()
    }

    /// Apply a registry-reported status change.
    ///
    /// Re-reporting the current status is accepted as a no-op.
    pub fn transition(&mut self, next: NodeStatus) -> Result<(), MembershipError> {
        if self.status == next {
            return Ok(());
        }
        if !self.status.can_transition_to(next) {
            return Err(MembershipError::InvalidTransition {
                address: self.address,
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Immutable set of operational nodes, sorted by address.
///
/// Published by the membership view as a whole and never mutated afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: Vec<NodeRecord>,
    operator_count: usize,
}

impl NodeSet {
    /// Build a set from registry records. Non-operational records are dropped,
    /// duplicate addresses keep the first record.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = NodeRecord>,
    {
        let mut seen = HashSet::new();
        let mut nodes: Vec<NodeRecord> = records
            .into_iter()
            .filter(|r| r.is_operational())
            .filter(|r| seen.insert(r.address))
            .collect();
        nodes.sort_by_key(|r| r.address);

        let operator_count = nodes
            .iter()
            .map(|r| r.operator)
            .collect::<HashSet<_>>()
            .len();

        Self {
            nodes,
            operator_count,
        }
    }

    /// Operational nodes, sorted by address.
    pub fn nodes(&self) -> &[NodeRecord] {
        &self.nodes
    }

    /// Number of operational nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if there are no operational nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of distinct operators across operational nodes.
    pub fn operator_count(&self) -> usize {
        self.operator_count
    }

    /// Check if `address` is operational in this set.
    pub fn contains(&self, address: &NodeAddress) -> bool {
        self.nodes
            .binary_search_by_key(address, |r| r.address)
            .is_ok()
    }

    /// Look up an operational node.
    pub fn get(&self, address: &NodeAddress) -> Option<&NodeRecord> {
        self.nodes
            .binary_search_by_key(address, |r| r.address)
            .ok()
            .map(|i| &self.nodes[i])
    }

    /// Operational addresses, sorted.
    pub fn addresses(&self) -> impl Iterator<Item = NodeAddress> + '_ {
        self.nodes.iter().map(|r| r.address)
    }
}
