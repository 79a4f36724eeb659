//! # Algorithms Module
//!
//! Candidate ranking and placement selection. No I/O, no locking.

pub mod candidate_selection;
pub mod placement;

pub use candidate_selection::{
    candidate_pool, node_score, plan_candidates, rank_nodes, select_candidates, CandidatePlan,
    RankedNode,
};
pub use placement::{
    build_final_node_list, choose_nodes, ranked_placement, select_required_operator_node,
    Placement,
};
