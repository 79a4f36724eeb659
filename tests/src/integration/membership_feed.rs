//! # Membership Feed
//!
//! The registry event feed drives the distributor's membership view through
//! the watcher spawned by `start`:
//!
//! - nodes joining and leaving are reflected in placement
//! - a lagged feed is recovered by reloading at the current block
//! - removed nodes may return only through fresh registration

#[cfg(test)]
mod tests {
    use crate::support::*;
    use std::sync::Arc;
    use stream_placement::{
        start, DistributorConfig, InMemoryNodeRegistry, NodeStatus, StreamDistributionSettings,
        StreamDistributor,
    };

    fn settings() -> StreamDistributionSettings {
        StreamDistributionSettings::new(3, 1)
    }

    #[tokio::test]
    async fn test_joined_node_receives_streams() {
        let registry = registry_with(operational_nodes(5));
        let (dist, _tasks) = start(distributor(
            Arc::clone(&registry),
            settings(),
            DistributorConfig::cold(),
        ))
        .await
        .unwrap();

        for stream_id in ChannelIds::new().take(300) {
            dist.choose_stream_nodes(&stream_id, 3).await.unwrap();
        }

        registry.register_node(node(5), operator(5), NodeStatus::Operational);
        wait_for(|| dist.current_operational_nodes().contains(&node(5))).await;

        for stream_id in ChannelIds::new().skip(300).take(100) {
            dist.choose_stream_nodes(&stream_id, 3).await.unwrap();
        }
        // A zero-load node wins every candidate pool it appears in.
        assert!(dist.load_snapshot().load(&node(5)) > 0);
    }

    #[tokio::test]
    async fn test_removed_node_no_longer_chosen() {
        let registry = registry_with(operational_nodes(6));
        let (dist, _tasks) = start(distributor(
            Arc::clone(&registry),
            settings(),
            DistributorConfig::cold(),
        ))
        .await
        .unwrap();

        registry.remove_node(node(2));
        wait_for(|| !dist.current_operational_nodes().contains(&node(2))).await;
        let before = dist.load_snapshot().load(&node(2));

        for stream_id in ChannelIds::new().take(200) {
            let chosen = dist.choose_stream_nodes(&stream_id, 3).await.unwrap();
            assert!(!chosen.contains(&node(2)));
        }
        assert_eq!(dist.load_snapshot().load(&node(2)), before);
    }

    #[tokio::test]
    async fn test_status_changes_follow_registry() {
        let registry = registry_with(operational_nodes(4));
        let (dist, _tasks) = start(distributor(
            Arc::clone(&registry),
            settings(),
            DistributorConfig::cold(),
        ))
        .await
        .unwrap();

        registry.register_node(node(10), operator(10), NodeStatus::Registered);
        registry.update_status(node(10), NodeStatus::Operational);
        wait_for(|| dist.current_operational_nodes().len() == 5).await;

        registry.update_status(node(10), NodeStatus::NonOperational);
        wait_for(|| dist.current_operational_nodes().len() == 4).await;
    }

    #[tokio::test]
    async fn test_reregistered_node_returns() {
        let registry = registry_with(operational_nodes(4));
        let (dist, _tasks) = start(distributor(
            Arc::clone(&registry),
            settings(),
            DistributorConfig::cold(),
        ))
        .await
        .unwrap();

        registry.remove_node(node(1));
        wait_for(|| dist.current_operational_nodes().len() == 3).await;

        registry.register_node(node(1), operator(1), NodeStatus::Operational);
        wait_for(|| dist.current_operational_nodes().contains(&node(1))).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_burst_converges_with_small_feed() {
        let registry = Arc::new(InMemoryNodeRegistry::with_feed_capacity(2));
        for i in 0..3 {
            registry.register_node(node(i), operator(i), NodeStatus::Operational);
        }
        let (dist, _tasks) = start(distributor(
            Arc::clone(&registry),
            settings(),
            DistributorConfig::cold(),
        ))
        .await
        .unwrap();

        for i in 3..40 {
            registry.register_node(node(i), operator(i), NodeStatus::Operational);
        }
        wait_for(|| dist.current_operational_nodes().len() == 40).await;

        let chosen = dist
            .choose_stream_nodes(&random_stream_id(), 3)
            .await
            .unwrap();
        assert_eq!(chosen.len(), 3);
    }

    #[tokio::test]
    async fn test_shutdown_stops_watcher() {
        let registry = registry_with(operational_nodes(3));
        let (dist, mut tasks) = start(distributor(
            Arc::clone(&registry),
            settings(),
            DistributorConfig::cold(),
        ))
        .await
        .unwrap();
        assert_eq!(tasks.len(), 1);

        tasks.shutdown();
        assert!(tasks.is_empty());

        registry.register_node(node(3), operator(3), NodeStatus::Operational);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(dist.current_operational_nodes().len(), 3);
    }
}
