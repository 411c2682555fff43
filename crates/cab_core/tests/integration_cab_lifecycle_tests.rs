mod support;

use cab_core::entity::CabStatus;
use cab_core::ids::{CabId, Location, RideId};
use cab_core::messages::{CoordinatorMessage, DispatcherNotice, RideCompleted};
use support::harness::{CabHarness, Coordinator};

#[tokio::test]
async fn full_ride_through_the_cab_task() {
    let mut harness = CabHarness::spawn("cab-10", 1);
    let mut coordinator = Coordinator::new();

    harness.cab.sign_in(Location(10)).expect("sign in");
    assert_eq!(
        harness.next_notice(0).await,
        DispatcherNotice::CabSignedIn {
            cab_id: CabId::new("cab-10"),
            location: Location(10),
            seq: 0,
        }
    );

    let first = coordinator.probe(&harness.cab, 1, 10, 20).await;
    let second = coordinator.probe(&harness.cab, 1, 10, 20).await;
    assert!(!first.accepted);
    assert!(second.accepted);
    assert_eq!(second.seq, first.seq + 1);

    harness.cab.ride_started().expect("ride started");
    harness.cab.ride_ended().expect("ride ended");
    assert_eq!(
        coordinator.next().await,
        CoordinatorMessage::RideCompleted(RideCompleted { seq: 3 })
    );
    assert_eq!(harness.cab.num_rides().await.expect("count").count, 1);

    let cab = harness.finish().await;
    assert_eq!(cab.status(), CabStatus::Available);
    assert_eq!(cab.last_location(), Some(Location(20)));
    assert_eq!(cab.completed_rides(), 1);
    assert!(cab.active_ride().is_none());
}

#[tokio::test]
async fn sign_out_leaves_interest_untouched_and_rejects_probes() {
    let mut harness = CabHarness::spawn("cab-11", 2);
    let mut coordinator = Coordinator::new();

    harness.cab.sign_in(Location(1)).expect("sign in");
    assert!(!coordinator.probe(&harness.cab, 1, 1, 2).await.accepted);
    harness.cab.sign_out().expect("sign out");
    assert!(!coordinator.probe(&harness.cab, 1, 1, 2).await.accepted);

    assert!(matches!(
        harness.next_notice(0).await,
        DispatcherNotice::CabSignedIn { .. }
    ));
    assert!(matches!(
        harness.next_notice(1).await,
        DispatcherNotice::CabSignedOut { .. }
    ));

    let cab = harness.finish().await;
    assert_eq!(cab.status(), CabStatus::SignedOut);
    assert!(cab.is_interested());
}

#[tokio::test]
async fn cancellation_returns_cab_to_service_without_counting() {
    let harness = CabHarness::spawn("cab-12", 1);
    let mut coordinator = Coordinator::new();

    harness.cab.sign_in(Location(5)).expect("sign in");
    coordinator.probe(&harness.cab, 1, 5, 6).await;
    assert!(coordinator.probe(&harness.cab, 1, 5, 6).await.accepted);
    harness.cab.ride_started().expect("ride started");
    harness.cab.ride_canceled().expect("ride canceled");

    assert!(!coordinator.probe(&harness.cab, 2, 5, 7).await.accepted);
    assert!(coordinator.probe(&harness.cab, 2, 5, 7).await.accepted);
    assert_eq!(harness.cab.num_rides().await.expect("count").count, 0);

    let cab = harness.finish().await;
    assert_eq!(cab.status(), CabStatus::Committed);
    assert_eq!(cab.last_location(), Some(Location(5)));
    assert_eq!(cab.active_ride().expect("ride").ride_id, RideId(2));
}

#[tokio::test]
async fn concurrent_probers_never_double_book_a_cab() {
    let harness = CabHarness::spawn("cab-13", 1);
    harness.cab.sign_in(Location(0)).expect("sign in");

    let mut tasks = Vec::new();
    for ride in 0..8u64 {
        let cab = harness.cab.clone();
        tasks.push(tokio::spawn(async move {
            let mut coordinator = Coordinator::new();
            let mut accepted = 0;
            for _ in 0..4 {
                if coordinator.probe(&cab, ride, 0, ride + 1).await.accepted {
                    accepted += 1;
                }
            }
            accepted
        }));
    }

    let mut total_accepted = 0;
    for task in tasks {
        total_accepted += task.await.expect("prober");
    }
    assert_eq!(total_accepted, 1);

    let cab = harness.finish().await;
    assert_eq!(cab.status(), CabStatus::Committed);
}
