//! # Outbound Ports
//!
//! Traits for external dependencies (node registry, on-chain configuration).

use crate::domain::{
    BlockNumber, NodeAddress, NodeRecord, RegistryError, RegistryEvent, StreamDistributionSettings,
};
use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

/// Live feed of registry membership events.
///
/// A `FeedLagged` item means events were dropped; the consumer must reload.
/// End of stream means the feed was closed.
pub type RegistryEventStream =
    Pin<Box<dyn Stream<Item = Result<RegistryEvent, RegistryError>> + Send + 'static>>;

/// Node registry - outbound port.
///
/// Read-only view of the on-chain node registry.
#[async_trait]
pub trait NodeRegistry: Send + Sync {
    /// Current registry height.
    async fn block_number(&self) -> Result<BlockNumber, RegistryError>;

    /// All registered nodes at `block`, in any status.
    async fn get_all_nodes(&self, block: BlockNumber) -> Result<Vec<NodeRecord>, RegistryError>;

    /// Number of streams placed on `node` at `block`.
    async fn get_stream_count_on_node(
        &self,
        block: BlockNumber,
        node: &NodeAddress,
    ) -> Result<u64, RegistryError>;

    /// Subscribe to membership events emitted after this call.
    fn subscribe(&self) -> RegistryEventStream;
}

/// On-chain configuration - outbound port.
pub trait OnChainConfig: Send + Sync {
    /// Current stream distribution settings.
    fn stream_distribution(&self) -> StreamDistributionSettings;
}
