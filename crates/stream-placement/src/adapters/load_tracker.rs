//! Load Tracker
//!
//! Per-node count of streams this process believes each node hosts. Counts
//! only move up between reseeds.

use crate::algorithms::Placement;
use crate::domain::{LoadSnapshot, NodeAddress, NodeSet, PlacementError};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Per-node stream counts behind one exclusive lock.
#[derive(Default)]
pub struct LoadTracker {
    counts: Mutex<HashMap<NodeAddress, u64>>,
}

impl LoadTracker {
    /// Create a tracker with every node at zero (cold start).
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all counts (warm start, reseed).
    pub fn seed(&self, counts: HashMap<NodeAddress, u64>) {
        *self.counts.lock() = counts;
    }

    /// Overwrite the counts of the nodes in `load` that belong to `known`.
    /// Other counts are left as they are. Returns how many entries were applied.
    pub fn overwrite(&self, load: HashMap<NodeAddress, u64>, known: &NodeSet) -> usize {
        let mut counts = self.counts.lock();
        let mut applied = 0;
        for (node, count) in load {
            if known.contains(&node) {
                counts.insert(node, count);
                applied += 1;
            }
        }
        applied
    }

    /// Copy of the current counts.
    pub fn snapshot(&self) -> LoadSnapshot {
        LoadSnapshot::new(self.counts.lock().clone())
    }

    /// Count for one node. Untracked nodes have zero load.
    pub fn load(&self, node: &NodeAddress) -> u64 {
        self.counts.lock().get(node).copied().unwrap_or(0)
    }

    /// Check if `node` has an entry.
    pub fn is_tracked(&self, node: &NodeAddress) -> bool {
        self.counts.lock().contains_key(node)
    }

    /// Start tracking `node` at zero if it has no entry yet.
    pub fn track(&self, node: NodeAddress) {
        self.counts.lock().entry(node).or_insert(0);
    }

    /// Record one more stream on `node`.
    #[cfg(any(test, feature = "simulation"))]
    pub(crate) fn increment(&self, node: &NodeAddress) {
        let mut counts = self.counts.lock();
        let count = counts.entry(*node).or_insert(0);
        *count = count.saturating_add(1);
    }

    /// Run a placement decision against the current counts and increment the
    /// chosen nodes, all under one lock acquisition.
    ///
    /// Nothing is incremented if `choose` fails.
    pub fn place<F>(&self, choose: F) -> Result<Placement, PlacementError>
    where
        F: FnOnce(&HashMap<NodeAddress, u64>) -> Result<Placement, PlacementError>,
    {
        let mut counts = self.counts.lock();
        let placement = choose(&*counts)?;
        for node in &placement.nodes {
            let count = counts.entry(*node).or_insert(0);
            *count = count.saturating_add(1);
        }
        Ok(placement)
    }
}
