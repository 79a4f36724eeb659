//! In-Memory Node Registry
//!
//! Implements the `NodeRegistry` port over a local table. Every mutation
//! advances the block height and is broadcast on the event feed.
//!
//! Used by tests and the simulation tool. In production the port is backed by
//! the on-chain registry contract.

use crate::domain::{
    BlockNumber, NodeAddress, NodeRecord, NodeStatus, RegistryError, RegistryEvent,
};
use crate::ports::outbound::{NodeRegistry, RegistryEventStream};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::debug;

/// Default capacity of the event feed.
pub const DEFAULT_FEED_CAPACITY: usize = 1024;

#[derive(Default)]
struct RegistryState {
    block: BlockNumber,
    nodes: BTreeMap<NodeAddress, NodeRecord>,
    stream_counts: HashMap<NodeAddress, u64>,
    failure: Option<String>,
}

/// In-memory registry for testing.
pub struct InMemoryNodeRegistry {
    state: RwLock<RegistryState>,
    events: broadcast::Sender<RegistryEvent>,
    node_list_reads: AtomicU64,
}

impl InMemoryNodeRegistry {
    /// Create an empty registry at block 0.
    pub fn new() -> Self {
        Self::with_feed_capacity(DEFAULT_FEED_CAPACITY)
    }

    /// Create an empty registry whose feed buffers `capacity` events per subscriber.
    pub fn with_feed_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            state: RwLock::new(RegistryState::default()),
            events,
            node_list_reads: AtomicU64::new(0),
        }
    }

    /// Create a registry holding `records` at block 1, without emitting events.
    pub fn with_nodes(records: impl IntoIterator<Item = NodeRecord>) -> Self {
        let registry = Self::new();
        {
            let mut state = registry.state.write();
            for record in records {
                state.nodes.insert(record.address, record);
            }
            state.block = 1;
        }
        registry
    }

    /// Current height.
    pub fn height(&self) -> BlockNumber {
        self.state.read().block
    }

    /// Register a node (or re-register a removed one) and emit `NodeAdded`.
    pub fn register_node(
        &self,
        address: NodeAddress,
        operator: NodeAddress,
        status: NodeStatus,
    ) -> BlockNumber {
        let block = {
            let mut state = self.state.write();
            state.block += 1;
            state
                .nodes
                .insert(address, NodeRecord::new(address, operator, status));
            state.block
        };
        self.emit(RegistryEvent::NodeAdded {
            block,
            address,
            operator,
            status,
        });
        block
    }

    /// Mark a node non-operational and emit `NodeRemoved`. The record is kept.
    pub fn remove_node(&self, address: NodeAddress) -> BlockNumber {
        let block = {
            let mut state = self.state.write();
            state.block += 1;
            if let Some(record) = state.nodes.get_mut(&address) {
                record.status = NodeStatus::NonOperational;
            }
            state.block
        };
        self.emit(RegistryEvent::NodeRemoved { block, address });
        block
    }

    /// Change a node's status and emit `NodeStatusUpdated`.
    pub fn update_status(&self, address: NodeAddress, status: NodeStatus) -> BlockNumber {
        let block = {
            let mut state = self.state.write();
            state.block += 1;
            if let Some(record) = state.nodes.get_mut(&address) {
                record.status = status;
            }
            state.block
        };
        self.emit(RegistryEvent::NodeStatusUpdated {
            block,
            address,
            status,
        });
        block
    }

    /// Set the committed stream count of a node.
    pub fn set_stream_count(&self, address: NodeAddress, count: u64) {
        self.state.write().stream_counts.insert(address, count);
    }

    /// Add committed streams to a node, as a successful registry commit would.
    pub fn add_streams(&self, address: NodeAddress, count: u64) {
        let mut state = self.state.write();
        let entry = state.stream_counts.entry(address).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Make every read fail with `Unavailable(reason)` until cleared with `None`.
    pub fn set_failure(&self, reason: Option<String>) {
        self.state.write().failure = reason;
    }

    /// Number of `get_all_nodes` calls served so far.
    pub fn node_list_reads(&self) -> u64 {
        self.node_list_reads.load(Ordering::Relaxed)
    }

    fn emit(&self, event: RegistryEvent) {
        // No subscribers is fine.
        let receivers = self.events.send(event.clone()).unwrap_or(0);
        debug!(kind = event.kind(), block = event.block(), receivers, "Registry event emitted");
    }

    fn check_available(state: &RegistryState) -> Result<(), RegistryError> {
        match &state.failure {
            Some(reason) => Err(RegistryError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

impl Default for InMemoryNodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeRegistry for InMemoryNodeRegistry {
    async fn block_number(&self) -> Result<BlockNumber, RegistryError> {
        let state = self.state.read();
        Self::check_available(&state)?;
        Ok(state.block)
    }

    async fn get_all_nodes(&self, _block: BlockNumber) -> Result<Vec<NodeRecord>, RegistryError> {
        self.node_list_reads.fetch_add(1, Ordering::Relaxed);
        let state = self.state.read();
        Self::check_available(&state)?;
        Ok(state.nodes.values().cloned().collect())
    }

    async fn get_stream_count_on_node(
        &self,
        _block: BlockNumber,
        node: &NodeAddress,
    ) -> Result<u64, RegistryError> {
        let state = self.state.read();
        Self::check_available(&state)?;
        Ok(state.stream_counts.get(node).copied().unwrap_or(0))
    }

    fn subscribe(&self) -> RegistryEventStream {
        let stream = BroadcastStream::new(self.events.subscribe()).map(|item| {
            item.map_err(|BroadcastStreamRecvError::Lagged(missed)| RegistryError::FeedLagged(missed))
        });
        Box::pin(stream)
    }
}
