use std::io::Write;

use cab_core::config::ShardSelectionKind;
use cab_core::entity::CabStatus;
use cab_sim::runner::{run_scenario, SimError};
use cab_sim::scenario::ScenarioParams;

fn small_scenario() -> ScenarioParams {
    ScenarioParams::default()
        .with_cabs(6)
        .with_shards(2)
        .with_rides(40)
        .with_wave_size(4)
        .with_seed(7)
}

#[tokio::test]
async fn every_ride_gets_exactly_one_outcome() {
    let summary = run_scenario(&small_scenario()).await.expect("scenario");

    assert_eq!(summary.rides_requested, 40);
    assert_eq!(
        summary.rides_completed
            + summary.rides_canceled
            + summary.rides_unmatched
            + summary.rides_abandoned,
        40
    );
    assert_eq!(summary.rides_abandoned, 0);
    assert!(summary.rides_completed > 0);
}

#[tokio::test]
async fn reset_counts_match_completed_rides() {
    let summary = run_scenario(&small_scenario().with_cancel_probability(0.0))
        .await
        .expect("scenario");

    assert_eq!(summary.rides_canceled, 0);
    assert_eq!(summary.total_cab_rides(), summary.rides_completed as u64);
    assert_eq!(summary.cab_ride_counts.len(), 6);
}

#[tokio::test]
async fn fleet_ends_signed_out() {
    let summary = run_scenario(&small_scenario()).await.expect("scenario");

    assert_eq!(summary.cabs.len(), 6);
    assert!(summary
        .cabs
        .iter()
        .all(|cab| cab.status == CabStatus::SignedOut && cab.active_ride_id.is_none()));
}

#[tokio::test]
async fn hash_selection_leaves_no_stale_registrations() {
    let params = small_scenario().with_shard_selection(ShardSelectionKind::Hash);
    let summary = run_scenario(&params).await.expect("scenario");

    assert_eq!(summary.stale_registrations, 0);
    assert_eq!(summary.stale_notices, 0);
}

#[tokio::test]
async fn crowded_wave_still_resolves_every_ride() {
    let params = small_scenario()
        .with_cabs(2)
        .with_shards(1)
        .with_rides(6)
        .with_wave_size(6)
        .with_cancel_probability(0.0);
    let summary = run_scenario(&params).await.expect("scenario");

    assert_eq!(summary.rides_completed + summary.rides_unmatched, 6);
    assert!(summary.rides_completed >= 1);
    assert_eq!(summary.total_cab_rides(), summary.rides_completed as u64);
}

#[tokio::test]
async fn invalid_scenario_is_rejected_before_running() {
    let error = run_scenario(&small_scenario().with_shards(0))
        .await
        .expect_err("invalid");
    assert!(matches!(error, SimError::Config(_)));
}

#[test]
fn scenario_file_round_trips_through_load() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"{{ "num_cabs": 3, "num_rides": 9, "cab": {{ "lifecycle": "permissive" }} }}"#
    )
    .expect("write");

    let params = ScenarioParams::load(file.path()).expect("params");
    assert_eq!(params.num_cabs, 3);
    assert_eq!(params.num_rides, 9);
    assert_eq!(
        params.cab.lifecycle,
        cab_core::config::LifecyclePolicy::Permissive
    );
}
