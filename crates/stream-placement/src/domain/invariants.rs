//! # Domain Invariants
//!
//! Rules every placement decision and load snapshot must satisfy.

use super::entities::NodeSet;
use super::errors::NodeAddress;
use super::value_objects::LoadSnapshot;
use std::collections::HashSet;
use thiserror::Error;

/// Maximum allowed spread between the most and least loaded node, in percent
/// of the least loaded node's count.
pub const MAX_LOAD_SKEW_PERCENT: u64 = 10;

/// Violation of a placement invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// Result size differs from the replication factor.
    #[error("Expected {expected} nodes, got {got}")]
    WrongCardinality {
        /// Requested replication factor
        expected: usize,
        /// Result size
        got: usize,
    },
    /// A node appears more than once.
    #[error("Node {0} chosen more than once")]
    DuplicateNode(NodeAddress),
    /// A node was not operational at decision time.
    #[error("Node {0} is not operational")]
    NotOperational(NodeAddress),
    /// A node's load decreased without a reseed.
    #[error("Load of node {node} decreased from {before} to {after}")]
    LoadDecreased {
        /// Affected node
        node: NodeAddress,
        /// Earlier count
        before: u64,
        /// Later count
        after: u64,
    },
}

/// Invariant: a result holds exactly `replication_factor` distinct operational nodes.
pub fn invariant_valid_placement(
    result: &[NodeAddress],
    replication_factor: usize,
    operational: &NodeSet,
) -> Result<(), InvariantViolation> {
    if result.len() != replication_factor {
        return Err(InvariantViolation::WrongCardinality {
            expected: replication_factor,
            got: result.len(),
        });
    }

    let mut seen = HashSet::with_capacity(result.len());
    for node in result {
        if !seen.insert(node) {
            return Err(InvariantViolation::DuplicateNode(*node));
        }
        if !operational.contains(node) {
            return Err(InvariantViolation::NotOperational(*node));
        }
    }

    Ok(())
}

/// Invariant: no node's count went down between two snapshots.
pub fn invariant_monotonic_load(
    before: &LoadSnapshot,
    after: &LoadSnapshot,
) -> Result<(), InvariantViolation> {
    for (node, &count) in before.iter() {
        let later = after.load(node);
        if later < count {
            return Err(InvariantViolation::LoadDecreased {
                node: *node,
                before: count,
                after: later,
            });
        }
    }
    Ok(())
}

/// Invariant: `max(load) <= (100 + skew_percent)% of min(load)` over `nodes`.
///
/// An empty node list is trivially balanced.
pub fn invariant_balanced_load<'a, I>(snapshot: &LoadSnapshot, nodes: I, skew_percent: u64) -> bool
where
    I: IntoIterator<Item = &'a NodeAddress>,
{
    let loads: Vec<u64> = nodes.into_iter().map(|n| snapshot.load(n)).collect();
    match (loads.iter().min(), loads.iter().max()) {
        (Some(&min), Some(&max)) => max * 100 <= min * (100 + skew_percent),
        _ => true,
    }
}
