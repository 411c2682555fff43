//! Load tests for cab_sim: a large fleet under sustained ride traffic.

use std::time::Instant;

use cab_core::config::ShardSelectionKind;
use cab_sim::runner::run_scenario;
use cab_sim::scenario::ScenarioParams;

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Only run explicitly: cargo test --package cab_sim --test load_tests -- --ignored
async fn test_sustained_ride_load() {
    let params = ScenarioParams::default()
        .with_cabs(500)
        .with_shards(8)
        .with_rides(20_000)
        .with_wave_size(200)
        .with_seed(42);

    let start = Instant::now();
    let summary = run_scenario(&params).await.expect("scenario");
    let duration = start.elapsed();

    let rides_per_sec = summary.rides_requested as f64 / duration.as_secs_f64();
    println!(
        "Sustained load test: {} rides in {:.2}s ({:.0} rides/sec, {} probes)",
        summary.rides_requested,
        duration.as_secs_f64(),
        rides_per_sec,
        summary.probes_sent
    );

    assert_eq!(summary.rides_abandoned, 0);
    assert_eq!(
        summary.rides_completed
            + summary.rides_canceled
            + summary.rides_unmatched
            + summary.rides_abandoned,
        20_000
    );
    assert!(
        rides_per_sec > 500.0,
        "throughput too low: {rides_per_sec:.0} rides/sec"
    );
}

#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn test_many_shards_hash_selection() {
    let params = ScenarioParams::default()
        .with_cabs(200)
        .with_shards(64)
        .with_rides(5_000)
        .with_wave_size(100)
        .with_shard_selection(ShardSelectionKind::Hash)
        .with_seed(9);

    let summary = run_scenario(&params).await.expect("scenario");

    assert_eq!(summary.stale_registrations, 0);
    assert_eq!(summary.total_cab_rides(), summary.rides_completed as u64);
}
