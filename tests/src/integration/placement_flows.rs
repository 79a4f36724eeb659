//! # Placement Flows
//!
//! End-to-end placement through `StreamsDistributor` over the in-memory
//! registry:
//!
//! 1. **Result shape**: cardinality, uniqueness, operational membership
//! 2. **Operator diversity**: distinct operators whenever enough exist
//! 3. **Determinism**: identical state and inputs give identical results
//! 4. **Load accounting**: failures leave loads untouched, seeding is idempotent
//! 5. **Required operators**: every stream lands on a required operator

#[cfg(test)]
mod tests {
    use crate::support::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use stream_placement::{
        invariant_monotonic_load, invariant_valid_placement, DistributorConfig,
        DistributorSimulator, InMemoryNodeRegistry, NodeRecord, NodeStatus, PlacementError,
        StreamDistributionSettings, StreamDistributor,
    };

    // =============================================================================
    // RESULT SHAPE
    // =============================================================================

    #[tokio::test]
    async fn test_random_placements_are_valid() {
        let mut rng = StdRng::seed_from_u64(7);

        for round in 0..20 {
            let node_count: u32 = rng.gen_range(1..=30);
            let operator_count: u32 = rng.gen_range(1..=node_count);
            let extra: u64 = rng.gen_range(0..=4);

            let records = (0..node_count)
                .map(|i| NodeRecord::operational(node(i), operator(i % operator_count)))
                .chain((0..3).map(|i| {
                    NodeRecord::new(node(1_000 + i), operator(0), NodeStatus::NonOperational)
                }))
                .collect();
            let dist = distributor(
                registry_with(records),
                StreamDistributionSettings::new(1, extra),
                DistributorConfig::cold(),
            );
            dist.bootstrap().await.unwrap();
            let operational = dist.current_operational_nodes();
            assert_eq!(operational.len(), node_count as usize);

            for _ in 0..50 {
                let rf = rng.gen_range(1..=node_count as usize);
                let before = dist.load_snapshot();
                let chosen = dist
                    .choose_stream_nodes(&random_stream_id(), rf)
                    .await
                    .unwrap();

                invariant_valid_placement(&chosen, rf, &operational)
                    .unwrap_or_else(|v| panic!("round {round}: {v}"));
                invariant_monotonic_load(&before, &dist.load_snapshot()).unwrap();

                if rf <= operator_count as usize {
                    let operators: HashSet<_> = chosen
                        .iter()
                        .map(|n| operational.get(n).unwrap().operator)
                        .collect();
                    assert_eq!(operators.len(), rf, "round {round}: operators repeated");
                }
            }
        }
    }

    #[tokio::test]
    async fn test_every_placement_increments_chosen_nodes() {
        let dist = cold_distributor(10, StreamDistributionSettings::new(3, 2)).await;

        let mut expected: HashMap<_, u64> = HashMap::new();
        for stream_id in ChannelIds::new().take(200) {
            for n in dist.choose_stream_nodes(&stream_id, 3).await.unwrap() {
                *expected.entry(n).or_default() += 1;
            }
        }

        let snapshot = dist.load_snapshot();
        for (n, count) in expected {
            assert_eq!(snapshot.load(&n), count);
        }
        assert_eq!(snapshot.total(), 600);
    }

    #[tokio::test]
    async fn test_non_operational_nodes_never_chosen() {
        let records = vec![
            NodeRecord::operational(node(0), operator(0)),
            NodeRecord::operational(node(1), operator(1)),
            NodeRecord::new(node(2), operator(2), NodeStatus::NonOperational),
            NodeRecord::new(node(3), operator(3), NodeStatus::Registered),
        ];
        let dist = distributor(
            registry_with(records),
            StreamDistributionSettings::new(2, 3),
            DistributorConfig::cold(),
        );

        for stream_id in ChannelIds::new().take(50) {
            let chosen = dist.choose_stream_nodes(&stream_id, 2).await.unwrap();
            assert!(chosen.iter().all(|n| *n == node(0) || *n == node(1)));
        }
    }

    // =============================================================================
    // DETERMINISM
    // =============================================================================

    #[tokio::test]
    async fn test_identical_distributors_agree() {
        let settings = StreamDistributionSettings::new(3, 2);
        let a = cold_distributor(15, settings.clone()).await;
        let b = cold_distributor(15, settings).await;

        for stream_id in ChannelIds::new().take(500) {
            assert_eq!(
                a.choose_stream_nodes(&stream_id, 3).await.unwrap(),
                b.choose_stream_nodes(&stream_id, 3).await.unwrap()
            );
        }
        assert_eq!(a.load_snapshot(), b.load_snapshot());
    }

    #[tokio::test]
    async fn test_warm_start_matches_simulated_seed() {
        let counts: HashMap<_, u64> = (0..8).map(|i| (node(i), u64::from(i) * 3)).collect();

        let registry = registry_with(operational_nodes(8));
        for (n, count) in &counts {
            registry.set_stream_count(*n, *count);
        }
        let warm = distributor(
            registry,
            StreamDistributionSettings::new(3, 2),
            DistributorConfig::default(),
        );
        warm.bootstrap().await.unwrap();

        let seeded = cold_distributor(8, StreamDistributionSettings::new(3, 2)).await;
        seeded.set_node_stream_load(counts);

        assert_eq!(warm.load_snapshot(), seeded.load_snapshot());
        for stream_id in ChannelIds::new().take(100) {
            assert_eq!(
                warm.choose_stream_nodes(&stream_id, 3).await.unwrap(),
                seeded.choose_stream_nodes(&stream_id, 3).await.unwrap()
            );
        }
    }

    #[tokio::test]
    async fn test_seed_matches_replayed_increments() {
        let settings = StreamDistributionSettings::new(3, 2);
        let counts: HashMap<_, u64> = (0..9).map(|i| (node(i), u64::from(i % 4) * 5)).collect();

        let seeded = cold_distributor(9, settings.clone()).await;
        seeded.set_node_stream_load(counts.clone());

        let replayed = cold_distributor(9, settings).await;
        for (n, count) in &counts {
            for _ in 0..*count {
                replayed.assign_stream_to_node(n).unwrap();
            }
        }
        assert_eq!(seeded.node_stream_count(), replayed.node_stream_count());

        for stream_id in ChannelIds::new().take(200) {
            assert_eq!(
                seeded.choose_stream_nodes(&stream_id, 3).await.unwrap(),
                replayed.choose_stream_nodes(&stream_id, 3).await.unwrap()
            );
        }
    }

    // =============================================================================
    // LOAD ACCOUNTING
    // =============================================================================

    #[tokio::test]
    async fn test_insufficient_nodes_keeps_loads() {
        let dist = cold_distributor(4, StreamDistributionSettings::new(2, 1)).await;
        for stream_id in ChannelIds::new().take(10) {
            dist.choose_stream_nodes(&stream_id, 2).await.unwrap();
        }
        let before = dist.node_stream_count();

        let err = dist
            .choose_stream_nodes(&random_stream_id(), 5)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PlacementError::InsufficientNodes {
                requested: 5,
                available: 4
            }
        );
        assert_eq!(dist.node_stream_count(), before);
    }

    #[tokio::test]
    async fn test_seeding_is_idempotent() {
        let settings = StreamDistributionSettings::new(2, 1);
        let load: HashMap<_, u64> = (0..5).map(|i| (node(i), 10 + u64::from(i))).collect();

        let once = cold_distributor(5, settings.clone()).await;
        once.set_node_stream_load(load.clone());

        let twice = cold_distributor(5, settings).await;
        twice.set_node_stream_load(load.clone());
        twice.set_node_stream_load(load);
        assert_eq!(once.node_stream_count(), twice.node_stream_count());

        for stream_id in ChannelIds::new().take(200) {
            assert_eq!(
                once.choose_stream_nodes(&stream_id, 2).await.unwrap(),
                twice.choose_stream_nodes(&stream_id, 2).await.unwrap()
            );
        }
        assert_eq!(once.node_stream_count(), twice.node_stream_count());
    }

    #[tokio::test]
    async fn test_least_loaded_candidates_preferred() {
        let dist = cold_distributor(6, StreamDistributionSettings::new(1, 5)).await;
        let mut load: HashMap<_, u64> = (0..6).map(|i| (node(i), 100)).collect();
        load.insert(node(4), 0);
        dist.set_node_stream_load(load);

        let chosen = dist
            .choose_stream_nodes(&random_stream_id(), 1)
            .await
            .unwrap();
        assert_eq!(chosen, vec![node(4)]);
    }

    #[tokio::test]
    async fn test_concurrent_placements_are_counted() {
        let dist = Arc::new(cold_distributor(12, StreamDistributionSettings::new(3, 2)).await);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let dist = Arc::clone(&dist);
                tokio::spawn(async move {
                    for _ in 0..250 {
                        dist.choose_stream_nodes(&random_stream_id(), 3)
                            .await
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(dist.load_snapshot().total(), 8 * 250 * 3);
    }

    // =============================================================================
    // REQUIRED OPERATORS
    // =============================================================================

    #[tokio::test]
    async fn test_required_operator_always_hosts() {
        let records = (0..12)
            .map(|i| NodeRecord::operational(node(i), operator(i % 6)))
            .collect();
        let settings =
            StreamDistributionSettings::new(3, 1).with_required_operators(vec![operator(5)]);
        let dist = distributor(registry_with(records), settings, DistributorConfig::cold());
        dist.bootstrap().await.unwrap();
        let operational = dist.current_operational_nodes();

        for stream_id in ChannelIds::new().take(300) {
            let chosen = dist.choose_stream_nodes(&stream_id, 3).await.unwrap();
            invariant_valid_placement(&chosen, 3, &operational).unwrap();
            assert!(chosen
                .iter()
                .any(|n| operational.get(n).unwrap().operator == operator(5)));
        }
    }

    #[tokio::test]
    async fn test_required_operator_without_nodes_is_ignored() {
        let settings =
            StreamDistributionSettings::new(2, 1).with_required_operators(vec![operator(99)]);
        let dist = cold_distributor(5, settings).await;

        let chosen = dist
            .choose_stream_nodes(&random_stream_id(), 2)
            .await
            .unwrap();
        assert_eq!(chosen.len(), 2);
    }

    // =============================================================================
    // DEFAULTS
    // =============================================================================

    #[tokio::test]
    async fn test_default_factor_follows_on_chain_settings() {
        let registry = Arc::new(InMemoryNodeRegistry::with_nodes(operational_nodes(7)));
        let dist = distributor(
            registry,
            StreamDistributionSettings::new(4, 1),
            DistributorConfig::cold(),
        );

        let chosen = dist
            .choose_with_default_factor(&random_stream_id())
            .await
            .unwrap();
        assert_eq!(chosen.len(), 4);
    }
}
