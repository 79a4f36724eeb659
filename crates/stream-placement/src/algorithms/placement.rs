//! # Placement Chooser
//!
//! Picks exactly `replication_factor` nodes out of a stream's candidate pool,
//! preferring the least loaded candidates.
//!
//! ## Algorithm
//!
//! 1. Rank every operational node by `blake3(stream_id || address)`.
//! 2. If required operators are configured, pick one of their nodes by hash
//!    score plus a load penalty and pin it to the pool.
//! 3. Walk the ranking into a pool of `replication_factor + extra` candidates,
//!    one per operator where possible.
//! 4. Sort the pool by `(load, rank)` and take the first `replication_factor`.
//!    The pinned node replaces the last pick if load sorting dropped it.
//!
//! Everything here is pure. Load is read through a caller-supplied lookup so
//! the caller decides which lock guards it.

use super::candidate_selection::{candidate_pool, plan_candidates, rank_nodes, CandidatePlan, RankedNode};
use crate::domain::{
    NodeAddress, NodeSet, PlacementError, PlacementRequest, StreamDistributionSettings, StreamId,
};
use std::collections::HashSet;

/// Outcome of a placement decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Chosen nodes, least loaded first.
    pub nodes: Vec<NodeAddress>,
    /// Pool plan that was used.
    pub plan: CandidatePlan,
    /// Required-operator node pinned to the result, if any.
    pub required_node: Option<NodeAddress>,
}

/// Select the required-operator node for a stream.
///
/// Candidates are all ranked nodes run by one of `required_operators`.
/// Each gets `score / u64::MAX` plus a load penalty: zero for the least loaded
/// candidate, otherwise scaled linearly from `min_advantage` to
/// `max_advantage` across the candidates' load range. Lowest total wins.
///
/// Returns `None` when no operational node belongs to a required operator.
pub fn select_required_operator_node<'a, L>(
    ranked: &[RankedNode<'a>],
    required_operators: &[NodeAddress],
    (min_advantage, max_advantage): (f64, f64),
    load: &L,
) -> Option<RankedNode<'a>>
where
    L: Fn(&NodeAddress) -> u64,
{
    if required_operators.is_empty() {
        return None;
    }

    let required: HashSet<&NodeAddress> = required_operators.iter().collect();
    let candidates: Vec<(RankedNode<'a>, u64)> = ranked
        .iter()
        .filter(|node| required.contains(&node.record.operator))
        .map(|node| (*node, load(&node.record.address)))
        .collect();

    let min_count = candidates.iter().map(|(_, count)| *count).min()?;
    let max_count = candidates.iter().map(|(_, count)| *count).max()?;
    let range = max_count - min_count;

    let mut best: Option<(f64, RankedNode<'a>)> = None;
    for (node, count) in candidates {
        let hash_component = node.score as f64 / u64::MAX as f64;
        let diff = count - min_count;
        let penalty = if diff > 0 && range > 0 {
            let proportion = diff as f64 / range as f64;
            min_advantage + (max_advantage - min_advantage) * proportion
        } else {
            0.0
        };

        let score = hash_component + penalty;
        match best {
            Some((best_score, _)) if score >= best_score => {}
            _ => best = Some((score, node)),
        }
    }

    best.map(|(_, node)| node)
}

/// Take the first `replication_factor` of a load-sorted pool, making sure the
/// required node is present.
pub fn build_final_node_list(
    sorted_pool: &[RankedNode<'_>],
    replication_factor: usize,
    required: Option<NodeAddress>,
) -> Vec<NodeAddress> {
    let mut nodes: Vec<NodeAddress> = sorted_pool
        .iter()
        .take(replication_factor)
        .map(|c| c.address())
        .collect();

    if let Some(required) = required {
        if !nodes.contains(&required) {
            if let Some(last) = nodes.last_mut() {
                *last = required;
            }
        }
    }

    nodes
}

/// Choose the nodes for one stream.
///
/// Fails with [`PlacementError::InvalidReplicationFactor`] for a zero factor
/// and [`PlacementError::InsufficientNodes`] when the node set is too small.
/// Does not touch load; the caller increments the returned nodes.
pub fn choose_nodes<L>(
    request: &PlacementRequest,
    nodes: &NodeSet,
    settings: &StreamDistributionSettings,
    load: L,
) -> Result<Placement, PlacementError>
where
    L: Fn(&NodeAddress) -> u64,
{
    request.validate()?;

    let replication_factor = request.replication_factor;
    if nodes.len() < replication_factor {
        return Err(PlacementError::InsufficientNodes {
            requested: replication_factor,
            available: nodes.len(),
        });
    }

    let ranked = rank_nodes(&request.stream_id, nodes);
    let required = select_required_operator_node(
        &ranked,
        &settings.required_operators,
        settings.balancing_advantage(),
        &load,
    );

    let extra = usize::try_from(settings.extra_candidates_count).unwrap_or(usize::MAX);
    let plan = plan_candidates(replication_factor, extra, nodes.len(), nodes.operator_count());

    let mut pool = candidate_pool(&ranked, &plan, required);
    if pool.len() < replication_factor {
        return Err(PlacementError::InsufficientNodes {
            requested: replication_factor,
            available: pool.len(),
        });
    }
    pool.sort_by_cached_key(|c| (load(&c.record.address), c.rank));

    let required_node = required.map(|r| r.address());
    Ok(Placement {
        nodes: build_final_node_list(&pool, replication_factor, required_node),
        plan,
        required_node,
    })
}

/// Ranking-only placement: the first `replication_factor` nodes by score.
///
/// This is what every node computes with `extra_candidates_count = 0` and no
/// load, so peers can verify a pure consistent-hash placement.
pub fn ranked_placement(
    stream_id: &StreamId,
    nodes: &NodeSet,
    replication_factor: usize,
) -> Result<Vec<NodeAddress>, PlacementError> {
    PlacementRequest::new(*stream_id, replication_factor).validate()?;
    if nodes.len() < replication_factor {
        return Err(PlacementError::InsufficientNodes {
            requested: replication_factor,
            available: nodes.len(),
        });
    }
    Ok(rank_nodes(stream_id, nodes)
        .into_iter()
        .take(replication_factor)
        .map(|r| r.address())
        .collect())
}
