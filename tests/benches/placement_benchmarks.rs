//! # Stream Placement Benchmarks
//!
//! | Operation | Expectation |
//! |-----------|-------------|
//! | `rank_nodes` | O(n log n) in cluster size, no allocation beyond the ranking |
//! | `choose_nodes` | dominated by ranking; load lookups only for the pool |
//! | `choose_stream_nodes` | no registry I/O once the view is loaded |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use placement_tests::support::{cold_distributor, node, operational_nodes, ChannelIds};
use std::collections::HashMap;
use std::time::Duration;
use stream_placement::{
    choose_nodes, rank_nodes, NodeSet, PlacementRequest, StreamDistributionSettings,
    StreamDistributor,
};

const CLUSTER_SIZES: [u32; 4] = [10, 25, 100, 500];

fn bench_rank_nodes(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank-nodes");
    group.measurement_time(Duration::from_secs(5));

    for size in CLUSTER_SIZES {
        let nodes = NodeSet::from_records(operational_nodes(size));
        let stream_id = ChannelIds::new().next().unwrap();

        group.throughput(Throughput::Elements(u64::from(size)));
        group.bench_with_input(BenchmarkId::from_parameter(size), &nodes, |b, nodes| {
            b.iter(|| black_box(rank_nodes(&stream_id, nodes).len()))
        });
    }

    group.finish();
}

fn bench_choose_nodes(c: &mut Criterion) {
    let mut group = c.benchmark_group("choose-nodes");
    group.measurement_time(Duration::from_secs(5));

    let streams: Vec<_> = ChannelIds::new().take(1_000).collect();
    for size in CLUSTER_SIZES {
        let nodes = NodeSet::from_records(operational_nodes(size));
        let loads: HashMap<_, u64> = (0..size).map(|i| (node(i), u64::from(i % 7))).collect();
        let settings = StreamDistributionSettings::new(3, 2);

        group.bench_with_input(BenchmarkId::from_parameter(size), &nodes, |b, nodes| {
            let mut next = streams.iter().cycle();
            b.iter(|| {
                let request = PlacementRequest::new(*next.next().unwrap(), 3);
                black_box(choose_nodes(&request, nodes, &settings, |n| {
                    loads.get(n).copied().unwrap_or(0)
                }))
            })
        });
    }

    group.finish();
}

fn bench_distributor(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("choose-stream-nodes");
    group.measurement_time(Duration::from_secs(5));
    group.throughput(Throughput::Elements(1));

    for size in [25u32, 100] {
        let dist = runtime.block_on(cold_distributor(size, StreamDistributionSettings::new(3, 2)));
        let mut ids = ChannelIds::new();

        group.bench_function(BenchmarkId::from_parameter(size), |b| {
            b.iter(|| {
                let stream_id = ids.next().unwrap();
                black_box(runtime.block_on(dist.choose_stream_nodes(&stream_id, 3)))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_rank_nodes,
    bench_choose_nodes,
    bench_distributor
);
criterion_main!(benches);
