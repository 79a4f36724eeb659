//! # Candidate Selection
//!
//! Deterministic, coordination-free ranking of nodes for a stream.
//!
//! Every node gets a score derived from `blake3(stream_id || node_address)`.
//! Nodes are ranked by ascending score and the first
//! `replication_factor + extra_candidates` form the candidate pool. Any party
//! holding the same node set can recompute the ranking and verify a proposed
//! placement without trusting the proposer.

use crate::domain::{NodeAddress, NodeRecord, NodeSet, StreamId};

/// A node with its position in a stream's ranking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankedNode<'a> {
    /// The ranked node.
    pub record: &'a NodeRecord,
    /// Hash score for this stream.
    pub score: u64,
    /// Position in the ranking, 0 is best.
    pub rank: usize,
}

impl RankedNode<'_> {
    /// Address of the ranked node.
    pub fn address(&self) -> NodeAddress {
        self.record.address
    }

    /// Operator of the ranked node.
    pub fn operator(&self) -> NodeAddress {
        self.record.operator
    }
}

/// How many candidates to take and whether they must have distinct operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CandidatePlan {
    /// Pool size.
    pub wanted: usize,
    /// Skip nodes whose operator is already in the pool.
    pub unique_operators: bool,
    /// The replication factor exceeds the number of operators, so operator
    /// diversity could not be enforced.
    pub operator_shortfall: bool,
}

/// Per-node score for `stream_id`: the first 8 bytes of
/// `blake3(stream_id || address)`, big-endian.
pub fn node_score(stream_id: &StreamId, node: &NodeAddress) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(stream_id.as_bytes());
    hasher.update(node.as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_be_bytes(prefix)
}

/// Rank all nodes for `stream_id` by ascending score.
///
/// Equal scores fall back to address order so the ranking is a total order.
pub fn rank_nodes<'a>(stream_id: &StreamId, nodes: &'a NodeSet) -> Vec<RankedNode<'a>> {
    let mut scored: Vec<(u64, &'a NodeRecord)> = nodes
        .nodes()
        .iter()
        .map(|record| (node_score(stream_id, &record.address), record))
        .collect();
    scored.sort_unstable_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.address.cmp(&b.1.address)));

    scored
        .into_iter()
        .enumerate()
        .map(|(rank, (score, record))| RankedNode {
            record,
            score,
            rank,
        })
        .collect()
}

/// Decide the pool size and operator policy.
///
/// Operator diversity wins over extra candidates: when there are fewer
/// operators than `replication_factor + extra_candidates`, the pool shrinks to
/// the operator count (never below the replication factor). Only when the
/// replication factor itself exceeds the operator count is the constraint
/// dropped.
pub fn plan_candidates(
    replication_factor: usize,
    extra_candidates: usize,
    node_count: usize,
    operator_count: usize,
) -> CandidatePlan {
    let wanted = replication_factor
        .saturating_add(extra_candidates)
        .min(node_count);

    if wanted <= operator_count {
        CandidatePlan {
            wanted,
            unique_operators: true,
            operator_shortfall: false,
        }
    } else if replication_factor <= operator_count {
        CandidatePlan {
            wanted: operator_count,
            unique_operators: true,
            operator_shortfall: false,
        }
    } else {
        CandidatePlan {
            wanted,
            unique_operators: false,
            operator_shortfall: true,
        }
    }
}

/// Walk the ranking and collect the candidate pool.
///
/// `pinned` (a required-operator node) always takes the first slot.
pub fn candidate_pool<'a>(
    ranked: &[RankedNode<'a>],
    plan: &CandidatePlan,
    pinned: Option<RankedNode<'a>>,
) -> Vec<RankedNode<'a>> {
    let mut pool: Vec<RankedNode<'a>> = Vec::with_capacity(plan.wanted);
    pool.extend(pinned);

    for candidate in ranked {
        if pool.len() >= plan.wanted {
            break;
        }
        if pool.iter().any(|c| c.address() == candidate.address()) {
            continue;
        }
        if plan.unique_operators && pool.iter().any(|c| c.operator() == candidate.operator()) {
            continue;
        }
        pool.push(*candidate);
    }

    pool
}

/// Candidate pool for a stream without operator constraints: the first
/// `replication_factor + extra_candidates` ranked nodes, or all of them.
pub fn select_candidates<'a>(
    stream_id: &StreamId,
    nodes: &'a NodeSet,
    replication_factor: usize,
    extra_candidates: usize,
) -> Vec<RankedNode<'a>> {
    let mut ranked = rank_nodes(stream_id, nodes);
    ranked.truncate(replication_factor.saturating_add(extra_candidates));
    ranked
}
