//! # Test Fixtures
//!
//! Deterministic node sets, stream ids and distributor wiring shared by the
//! integration and simulation suites.

use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use stream_placement::{
    stream_type, DistributorConfig, InMemoryNodeRegistry, NodeAddress, NodeRecord,
    StaticOnChainConfig, StreamDistributionSettings, StreamId, StreamsDistributor,
};

/// Distributor over the in-memory adapters.
pub type TestDistributor = StreamsDistributor<InMemoryNodeRegistry, StaticOnChainConfig>;

/// Node address `i`, distinct for every `i`.
pub fn node(i: u32) -> NodeAddress {
    let mut bytes = [0u8; 20];
    bytes[0] = 0x4e;
    bytes[16..].copy_from_slice(&i.to_be_bytes());
    NodeAddress::new(bytes)
}

/// Operator address `i`, never equal to a node address.
pub fn operator(i: u32) -> NodeAddress {
    let mut bytes = [0u8; 20];
    bytes[0] = 0x0f;
    bytes[16..].copy_from_slice(&i.to_be_bytes());
    NodeAddress::new(bytes)
}

/// `count` operational nodes, each with its own operator.
pub fn operational_nodes(count: u32) -> Vec<NodeRecord> {
    (0..count)
        .map(|i| NodeRecord::operational(node(i), operator(i)))
        .collect()
}

/// Channel stream ids: `sha256(previous)` with the leading byte set to the
/// channel tag, starting from the all-zero id.
pub struct ChannelIds {
    current: [u8; 32],
}

impl ChannelIds {
    /// Start a fresh chain.
    pub fn new() -> Self {
        Self { current: [0u8; 32] }
    }
}

impl Default for ChannelIds {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for ChannelIds {
    type Item = StreamId;

    fn next(&mut self) -> Option<StreamId> {
        let mut next: [u8; 32] = Sha256::digest(self.current).into();
        next[0] = stream_type::CHANNEL;
        self.current = next;
        Some(StreamId::new(next))
    }
}

/// Random channel stream id.
pub fn random_stream_id() -> StreamId {
    let mut bytes: [u8; 32] = rand::random();
    bytes[0] = stream_type::CHANNEL;
    StreamId::new(bytes)
}

/// Registry holding `records`.
pub fn registry_with(records: Vec<NodeRecord>) -> Arc<InMemoryNodeRegistry> {
    Arc::new(InMemoryNodeRegistry::with_nodes(records))
}

/// Distributor over `registry` with fixed on-chain settings.
pub fn distributor(
    registry: Arc<InMemoryNodeRegistry>,
    settings: StreamDistributionSettings,
    config: DistributorConfig,
) -> TestDistributor {
    StreamsDistributor::new(registry, Arc::new(StaticOnChainConfig::new(settings)), config)
}

/// Bootstrapped cold-start distributor over `count` single-node operators.
pub async fn cold_distributor(count: u32, settings: StreamDistributionSettings) -> TestDistributor {
    let dist = distributor(
        registry_with(operational_nodes(count)),
        settings,
        DistributorConfig::cold(),
    );
    dist.bootstrap().await.expect("bootstrap");
    dist
}

/// Poll `condition` until it holds, panicking after about five seconds.
pub async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_ids_are_chained() {
        let first: Vec<_> = ChannelIds::new().take(4).collect();
        let second: Vec<_> = ChannelIds::new().take(4).collect();
        assert_eq!(first, second);
        assert!(first.iter().all(|id| id.stream_type() == stream_type::CHANNEL));
        assert_ne!(first[0], first[1]);
    }

    #[test]
    fn test_node_and_operator_spaces_disjoint() {
        assert_ne!(node(1), operator(1));
        assert_ne!(node(1), node(2));
    }
}
