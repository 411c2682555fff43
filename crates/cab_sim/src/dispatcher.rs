//! Demonstration dispatcher shard.
//!
//! A shard only knows the cabs whose sign-in notification landed on it, so its view is
//! partial and may go stale when a cab's sign-out is routed to another shard. Ride orders
//! are handed to a [RideCoordinator] on a separate task so the shard keeps draining
//! notifications while rides are in flight.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use cab_core::ids::{CabId, Location, RideId};
use cab_core::messages::DispatcherNotice;
use cab_core::reply::Mailbox;
use cab_core::runtime::CabHandle;
use cab_core::sequence::{SeqObservation, SequenceTracker};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, info_span, Instrument};

use crate::coordinator::{CoordinatorConfig, RideCoordinator, RideOutcome};

/// Lookup from cab id to its inbox, shared read-only by every shard.
pub type CabDirectory = Arc<HashMap<CabId, CabHandle>>;

#[derive(Debug)]
pub struct RideOrder {
    pub ride_id: RideId,
    pub pickup: Location,
    pub dropoff: Location,
    pub cancel: bool,
    pub done: oneshot::Sender<RideOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardReport {
    pub index: usize,
    pub rides_dispatched: u64,
    pub stale_notices: u64,
    /// Cabs this shard still believes are signed in when it stops.
    pub signed_in_at_exit: usize,
}

pub struct DispatcherShard {
    index: usize,
    directory: CabDirectory,
    signed_in: BTreeMap<CabId, Location>,
    tracker: SequenceTracker,
    rng: StdRng,
    coordinator_config: CoordinatorConfig,
    rides_dispatched: u64,
    stale_notices: u64,
}

impl DispatcherShard {
    pub fn new(
        index: usize,
        directory: CabDirectory,
        seed: u64,
        coordinator_config: CoordinatorConfig,
    ) -> Self {
        Self {
            index,
            directory,
            signed_in: BTreeMap::new(),
            tracker: SequenceTracker::default(),
            rng: StdRng::seed_from_u64(seed),
            coordinator_config,
            rides_dispatched: 0,
            stale_notices: 0,
        }
    }

    pub fn is_signed_in(&self, cab_id: &CabId) -> bool {
        self.signed_in.contains_key(cab_id)
    }

    pub fn signed_in_count(&self) -> usize {
        self.signed_in.len()
    }

    /// Applies a notification unless it is older than one already seen from the same cab.
    pub fn apply_notice(&mut self, notice: DispatcherNotice) {
        match self.tracker.observe(notice.cab_id(), notice.seq()) {
            SeqObservation::Fresh { .. } => {}
            observation => {
                debug!(shard = self.index, cab_id = %notice.cab_id(), ?observation, "stale notice ignored");
                self.stale_notices += 1;
                return;
            }
        }
        match notice {
            DispatcherNotice::CabSignedIn {
                cab_id, location, ..
            } => {
                self.signed_in.insert(cab_id, location);
            }
            DispatcherNotice::CabSignedOut { cab_id, .. } => {
                self.signed_in.remove(&cab_id);
            }
        }
    }

    /// Signed-in cabs known to the directory, in random order.
    pub fn candidates(&mut self) -> Vec<CabHandle> {
        let mut candidates: Vec<CabHandle> = self
            .signed_in
            .keys()
            .filter_map(|cab_id| self.directory.get(cab_id).cloned())
            .collect();
        candidates.shuffle(&mut self.rng);
        candidates
    }

    fn dispatch(&mut self, order: RideOrder) {
        let candidates = self.candidates();
        self.rides_dispatched += 1;
        let coordinator = RideCoordinator::new(
            order.ride_id,
            order.pickup,
            order.dropoff,
            self.coordinator_config,
        );
        let span = info_span!("ride", ride_id = %order.ride_id, shard = self.index);
        tokio::spawn(
            async move {
                let outcome = coordinator.fulfill(candidates, order.cancel).await;
                let _ = order.done.send(outcome);
            }
            .instrument(span),
        );
    }

    /// Runs until the order channel closes. Pending notifications are always applied
    /// before the next order.
    pub async fn run(
        mut self,
        mut notices: Mailbox<DispatcherNotice>,
        mut orders: mpsc::UnboundedReceiver<RideOrder>,
    ) -> ShardReport {
        info!(shard = self.index, "dispatcher shard started");
        loop {
            tokio::select! {
                biased;
                Some(notice) = notices.recv() => self.apply_notice(notice),
                order = orders.recv() => match order {
                    Some(order) => self.dispatch(order),
                    None => break,
                },
            }
        }
        while let Ok(notice) = notices.try_recv() {
            self.apply_notice(notice);
        }
        let report = ShardReport {
            index: self.index,
            rides_dispatched: self.rides_dispatched,
            stale_notices: self.stale_notices,
            signed_in_at_exit: self.signed_in.len(),
        };
        info!(
            shard = self.index,
            rides_dispatched = report.rides_dispatched,
            signed_in_at_exit = report.signed_in_at_exit,
            "dispatcher shard stopped"
        );
        report
    }
}
