//! Stream distributor service.
//!
//! Wires the membership view, the load tracker and the placement algorithm to
//! the registry and on-chain config ports.

use crate::adapters::{LoadTracker, MembershipView};
use crate::algorithms::choose_nodes;
use crate::config::DistributorConfig;
use crate::domain::{
    invariant_valid_placement, BlockNumber, LoadSnapshot, NodeAddress, NodeSet, PlacementError,
    PlacementRequest, RegistryEvent, StreamDistributionSettings, StreamId,
};
use crate::metrics;
use crate::ports::inbound::StreamDistributor;
use crate::ports::outbound::{NodeRegistry, OnChainConfig};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[cfg(any(test, feature = "simulation"))]
use crate::ports::inbound::DistributorSimulator;

/// Load-balanced stream distributor.
///
/// Once the membership view is loaded, placement is lock-bounded and does no
/// I/O. A cold view is loaded from the registry on first use.
pub struct StreamsDistributor<R, C> {
    registry: Arc<R>,
    on_chain: Arc<C>,
    config: DistributorConfig,
    membership: MembershipView,
    loads: LoadTracker,
    /// Serializes lazy loads of a cold view.
    cold_load: tokio::sync::Mutex<()>,
}

impl<R, C> StreamsDistributor<R, C>
where
    R: NodeRegistry,
    C: OnChainConfig,
{
    /// Create a cold distributor. Nothing is read from the registry until
    /// [`bootstrap`](Self::bootstrap) or the first placement.
    pub fn new(registry: Arc<R>, on_chain: Arc<C>, config: DistributorConfig) -> Self {
        Self {
            registry,
            on_chain,
            config,
            membership: MembershipView::new(),
            loads: LoadTracker::new(),
            cold_load: tokio::sync::Mutex::new(()),
        }
    }

    /// Load state at the current registry height.
    ///
    /// With `warm_start` the load tracker is seeded from the registry's
    /// per-node stream counts; otherwise every node starts at zero.
    pub async fn bootstrap(&self) -> Result<Arc<NodeSet>, PlacementError> {
        let block = self.registry.block_number().await?;
        if self.config.warm_start {
            self.reseed(block).await?;
            Ok(self.membership.current_operational_nodes())
        } else {
            self.reload(block).await
        }
    }

    /// Replace the membership view with the registry's node list at `block`.
    /// Loads are left as they are.
    pub async fn reload(&self, block: BlockNumber) -> Result<Arc<NodeSet>, PlacementError> {
        let records = match self.registry.get_all_nodes(block).await {
            Ok(records) => records,
            Err(e) => {
                error!(block, error = %e, "Failed to load nodes from registry");
                metrics::record_registry_reload(false);
                return Err(e.into());
            }
        };

        metrics::record_registry_reload(true);
        Ok(self.membership.replace(block, records))
    }

    /// Reload membership at the registry's current height.
    pub async fn reload_latest(&self) -> Result<Arc<NodeSet>, PlacementError> {
        let block = self.registry.block_number().await?;
        self.reload(block).await
    }

    /// Reload membership and replace every load with the registry's stream
    /// counts at `block`.
    ///
    /// All registry reads complete before anything is replaced, so a failed
    /// reseed leaves the distributor untouched.
    pub async fn reseed(&self, block: BlockNumber) -> Result<LoadSnapshot, PlacementError> {
        let records = match self.registry.get_all_nodes(block).await {
            Ok(records) => records,
            Err(e) => {
                error!(block, error = %e, "Failed to load nodes from registry");
                metrics::record_registry_reload(false);
                return Err(e.into());
            }
        };

        let mut counts = HashMap::new();
        for record in records.iter().filter(|r| r.is_operational()) {
            let count = self
                .registry
                .get_stream_count_on_node(block, &record.address)
                .await?;
            counts.insert(record.address, count);
        }

        metrics::record_registry_reload(true);
        self.membership.replace(block, records);
        self.loads.seed(counts);

        let snapshot = self.loads.snapshot();
        info!(block, total_streams = snapshot.total(), "Stream loads reseeded");
        Ok(snapshot)
    }

    /// Apply a membership event from the registry feed.
    ///
    /// Returns true when the operational set changed. Invalid transitions are
    /// logged and ignored. Events that arrive before the first load are
    /// dropped; the load itself will reflect them.
    pub fn apply_event(&self, event: &RegistryEvent) -> bool {
        if !self.membership.is_loaded() {
            debug!(kind = event.kind(), node = %event.address(), "Membership view cold, event dropped");
            return false;
        }

        match self.membership.apply(event) {
            Ok(changed) => {
                metrics::record_membership_event(event.kind());
                changed
            }
            Err(e) => {
                warn!(block = event.block(), error = %e, "Rejected membership event");
                metrics::record_membership_event_rejected();
                false
            }
        }
    }

    /// Place a stream with the on-chain default replication factor.
    pub async fn choose_with_default_factor(
        &self,
        stream_id: &StreamId,
    ) -> Result<Vec<NodeAddress>, PlacementError> {
        let replication_factor = usize::try_from(self.on_chain.stream_distribution().replication_factor)
            .unwrap_or(usize::MAX);
        self.choose_stream_nodes(stream_id, replication_factor).await
    }

    /// Current operational node set.
    pub fn current_operational_nodes(&self) -> Arc<NodeSet> {
        self.membership.current_operational_nodes()
    }

    /// Copy of the tracked per-node loads.
    pub fn load_snapshot(&self) -> LoadSnapshot {
        self.loads.snapshot()
    }

    /// Check if the membership view has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.membership.is_loaded()
    }

    /// Local configuration.
    pub fn config(&self) -> &DistributorConfig {
        &self.config
    }

    /// Registry this distributor reads from.
    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    async fn ensure_loaded(&self) -> Result<Arc<NodeSet>, PlacementError> {
        if self.membership.is_loaded() {
            return Ok(self.membership.current_operational_nodes());
        }

        let _guard = self.cold_load.lock().await;
        if !self.membership.is_loaded() {
            debug!("Membership view cold, loading from registry");
            self.bootstrap().await?;
        }
        Ok(self.membership.current_operational_nodes())
    }

    fn place(
        &self,
        request: &PlacementRequest,
        nodes: &NodeSet,
        settings: &StreamDistributionSettings,
    ) -> Result<Vec<NodeAddress>, PlacementError> {
        let placement = self.loads.place(|counts| {
            choose_nodes(request, nodes, settings, |node: &NodeAddress| {
                counts.get(node).copied().unwrap_or(0)
            })
        })?;

        if placement.plan.operator_shortfall {
            warn!(
                replication_factor = request.replication_factor,
                operators = nodes.operator_count(),
                "Replication factor exceeds number of operators, operator diversity not enforced"
            );
        }
        debug_assert!(
            invariant_valid_placement(&placement.nodes, request.replication_factor, nodes).is_ok()
        );

        Ok(placement.nodes)
    }
}

#[async_trait]
impl<R, C> StreamDistributor for StreamsDistributor<R, C>
where
    R: NodeRegistry,
    C: OnChainConfig,
{
    async fn choose_stream_nodes(
        &self,
        stream_id: &StreamId,
        replication_factor: usize,
    ) -> Result<Vec<NodeAddress>, PlacementError> {
        let request = PlacementRequest::new(*stream_id, replication_factor);
        request.validate()?;

        let nodes = self.ensure_loaded().await?;
        let settings = self.on_chain.stream_distribution();

        match self.place(&request, &nodes, &settings) {
            Ok(chosen) => {
                debug!(
                    stream_id = %stream_id,
                    replication_factor,
                    nodes = ?chosen,
                    "Stream placed"
                );
                metrics::record_stream_placed();
                Ok(chosen)
            }
            Err(e) => {
                warn!(stream_id = %stream_id, replication_factor, error = %e, "Stream placement failed");
                metrics::record_placement_failure(failure_reason(&e));
                Err(e)
            }
        }
    }
}

#[cfg(any(test, feature = "simulation"))]
impl<R, C> DistributorSimulator for StreamsDistributor<R, C>
where
    R: NodeRegistry,
    C: OnChainConfig,
{
    fn node_stream_count(&self) -> LoadSnapshot {
        let mut counts = self.loads.snapshot().into_inner();
        for node in self.membership.current_operational_nodes().addresses() {
            counts.entry(node).or_insert(0);
        }
        LoadSnapshot::new(counts)
    }

    fn node_stream_load(&self, node: &NodeAddress) -> Result<u64, PlacementError> {
        self.ensure_known(node)?;
        Ok(self.loads.load(node))
    }

    fn assign_stream_to_node(&self, node: &NodeAddress) -> Result<(), PlacementError> {
        self.ensure_known(node)?;
        self.loads.increment(node);
        Ok(())
    }

    fn set_node_stream_load(&self, load: HashMap<NodeAddress, u64>) {
        let requested = load.len();
        let nodes = self.membership.current_operational_nodes();
        let applied = self.loads.overwrite(load, &nodes);
        if applied < requested {
            debug!(requested, applied, "Ignored loads for unknown nodes");
        }
    }

    fn add_new_node(&self, address: NodeAddress, operator: NodeAddress) {
        let nodes = self.membership.admit(address, operator);
        self.loads.track(address);
        info!(node = %address, operator = %operator, operational = nodes.len(), "Simulated node added");
    }
}

#[cfg(any(test, feature = "simulation"))]
impl<R, C> StreamsDistributor<R, C>
where
    R: NodeRegistry,
    C: OnChainConfig,
{
    fn ensure_known(&self, node: &NodeAddress) -> Result<(), PlacementError> {
        if self.membership.node(node).is_some() || self.loads.is_tracked(node) {
            Ok(())
        } else {
            Err(PlacementError::UnknownNode(*node))
        }
    }
}

fn failure_reason(error: &PlacementError) -> &'static str {
    match error {
        PlacementError::InsufficientNodes { .. } => "insufficient_nodes",
        PlacementError::InvalidReplicationFactor(_) => "invalid_replication_factor",
        PlacementError::RegistryUnavailable(_) => "registry_unavailable",
        PlacementError::UnknownNode(_) => "unknown_node",
    }
}
