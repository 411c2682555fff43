//! Performance benchmarks for cab_core using Criterion.rs.

use cab_core::entity::CabEntity;
use cab_core::ids::{CabId, Location, RideId};
use cab_core::messages::{CabCommand, RideRequest};
use cab_core::reply::ReplyHandle;
use cab_core::shard::{DispatcherShards, HashShardSelector, RoundRobinShardSelector, ShardSelector};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_ride_cycle(c: &mut Criterion) {
    let (shard, mut shard_rx) = ReplyHandle::channel();
    let (coordinator, mut coordinator_rx) = ReplyHandle::channel();
    let mut cab = CabEntity::new("bench-cab")
        .with_shards(DispatcherShards::new(vec![shard]))
        .with_selector(Box::new(RoundRobinShardSelector::default()));
    cab.handle(CabCommand::SignIn {
        location: Location(0),
    });

    let mut ride = 0u64;
    c.bench_function("handshake_and_ride", |b| {
        b.iter(|| {
            ride += 1;
            for _ in 0..2 {
                cab.handle(CabCommand::RequestRide(RideRequest {
                    ride_id: RideId(ride),
                    pickup: Location(ride),
                    dropoff: Location(ride + 1),
                    reply_to: coordinator.clone(),
                }));
            }
            cab.handle(CabCommand::RideStarted);
            cab.handle(CabCommand::RideEnded);
            while coordinator_rx.try_recv().is_ok() {}
            while shard_rx.try_recv().is_ok() {}
            black_box(cab.completed_rides())
        });
    });
}

fn bench_shard_selectors(c: &mut Criterion) {
    let cab_id = CabId::new("bench-cab-0042");
    let mut group = c.benchmark_group("shard_selectors");
    for shard_count in [4usize, 64] {
        group.bench_with_input(
            BenchmarkId::new("round_robin", shard_count),
            &shard_count,
            |b, &shard_count| {
                let mut selector = RoundRobinShardSelector::default();
                b.iter(|| black_box(selector.select(&cab_id, shard_count)));
            },
        );
        group.bench_with_input(
            BenchmarkId::new("hash", shard_count),
            &shard_count,
            |b, &shard_count| {
                let mut selector = HashShardSelector;
                b.iter(|| black_box(selector.select(&cab_id, shard_count)));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_ride_cycle, bench_shard_selectors);
criterion_main!(benches);
