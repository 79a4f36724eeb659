//! Membership View
//!
//! Tracks every node the registry ever reported and publishes the operational
//! subset as an immutable [`NodeSet`]. Readers clone an `Arc` and never see a
//! half-applied update.

use crate::domain::{
    BlockNumber, MembershipError, NodeAddress, NodeRecord, NodeSet, NodeStatus, RegistryEvent,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Registry-backed set of nodes.
///
/// A single writer (feed watcher or reload) mutates the node table under a
/// mutex and then swaps the published snapshot.
pub struct MembershipView {
    /// Every node ever reported, including non-operational ones.
    table: Mutex<HashMap<NodeAddress, NodeRecord>>,
    /// Published operational snapshot.
    current: RwLock<Arc<NodeSet>>,
    /// Block of the last full load; `None` while cold.
    loaded_at: RwLock<Option<BlockNumber>>,
}

impl MembershipView {
    /// Create a cold view with no nodes.
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            current: RwLock::new(Arc::new(NodeSet::default())),
            loaded_at: RwLock::new(None),
        }
    }

    /// Latest operational snapshot.
    pub fn current_operational_nodes(&self) -> Arc<NodeSet> {
        Arc::clone(&self.current.read())
    }

    /// Check if the view has been loaded from the registry.
    pub fn is_loaded(&self) -> bool {
        self.loaded_at.read().is_some()
    }

    /// Block of the last full load.
    pub fn loaded_at(&self) -> Option<BlockNumber> {
        *self.loaded_at.read()
    }

    /// Recorded state of a node, operational or not.
    pub fn node(&self, address: &NodeAddress) -> Option<NodeRecord> {
        self.table.lock().get(address).cloned()
    }

    /// Number of nodes ever reported.
    pub fn known_nodes(&self) -> usize {
        self.table.lock().len()
    }

    /// Replace the whole table with a registry snapshot taken at `block`.
    pub fn replace(&self, block: BlockNumber, records: Vec<NodeRecord>) -> Arc<NodeSet> {
        let mut table = self.table.lock();
        table.clear();
        for record in records {
            table.entry(record.address).or_insert(record);
        }

        let published = self.publish(&table);
        *self.loaded_at.write() = Some(block);

        info!(
            block,
            known = table.len(),
            operational = published.len(),
            "Membership view reloaded"
        );
        published
    }

    /// Apply one feed event.
    ///
    /// Returns `Ok(true)` when the operational set changed. Events at or below
    /// the last loaded block are already part of the snapshot and are skipped.
    /// Rejected events leave the view untouched.
    pub fn apply(&self, event: &RegistryEvent) -> Result<bool, MembershipError> {
        if let Some(loaded) = self.loaded_at() {
            if event.block() <= loaded {
                debug!(block = event.block(), loaded, kind = event.kind(), "Skipping stale event");
                return Ok(false);
            }
        }

        let mut table = self.table.lock();
        let address = event.address();
        let previous = table
            .get(&address)
            .map(|r| (r.is_operational(), r.operator));

        let updated = match (event, table.get(&address)) {
            (
                RegistryEvent::NodeAdded {
                    operator, status, ..
                },
                None,
            ) => NodeRecord::new(address, *operator, *status),
            (
                RegistryEvent::NodeAdded {
                    operator, status, ..
                },
                Some(existing),
            ) => {
                let mut record = existing.clone();
                if record.status == NodeStatus::NonOperational && *status != NodeStatus::NonOperational {
                    record.transition(NodeStatus::Registered)?;
                }
                if record.status != *status {
                    record.transition(*status)?;
                }
                record.operator = *operator;
                record
            }
            (RegistryEvent::NodeRemoved { .. }, Some(existing)) => {
                let mut record = existing.clone();
                record.transition(NodeStatus::NonOperational)?;
                record
            }
            (RegistryEvent::NodeStatusUpdated { status, .. }, Some(existing)) => {
                let mut record = existing.clone();
                record.transition(*status)?;
                record
            }
            (RegistryEvent::NodeRemoved { .. }, None) => {
                return Err(unknown_node(address, NodeStatus::NonOperational));
            }
            (RegistryEvent::NodeStatusUpdated { status, .. }, None) => {
                return Err(unknown_node(address, *status));
            }
        };

        let after = updated.is_operational();
        let changed = match previous {
            Some((was_operational, old_operator)) => {
                was_operational != after || (after && old_operator != updated.operator)
            }
            None => after,
        };
        table.insert(address, updated);

        if changed {
            let published = self.publish(&table);
            info!(
                node = %address,
                kind = event.kind(),
                operational = published.len(),
                "Operational node set changed"
            );
        }
        Ok(changed)
    }

    /// Insert an operational node directly, bypassing the registry.
    ///
    /// Used by the simulator to model a node joining.
    pub fn admit(&self, address: NodeAddress, operator: NodeAddress) -> Arc<NodeSet> {
        let mut table = self.table.lock();
        table.insert(address, NodeRecord::operational(address, operator));
        self.publish(&table)
    }

    fn publish(&self, table: &HashMap<NodeAddress, NodeRecord>) -> Arc<NodeSet> {
        let set = Arc::new(NodeSet::from_records(table.values().cloned()));
        *self.current.write() = Arc::clone(&set);
        crate::metrics::set_operational_nodes(set.len());
        set
    }
}

impl Default for MembershipView {
    fn default() -> Self {
        Self::new()
    }
}

fn unknown_node(address: NodeAddress, to: NodeStatus) -> MembershipError {
    MembershipError::InvalidTransition {
        address,
        from: "Unknown".to_string(),
        to: to.to_string(),
    }
}
