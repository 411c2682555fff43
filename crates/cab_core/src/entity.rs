//! The cab state machine.
//!
//! A [CabEntity] owns one cab's state and applies one [CabCommand] at a time. It never
//! blocks and never fails: commands that do not fit the current state turn into a
//! rejection or a logged no-op. Every message it emits is stamped with the next value of
//! its reply sequence.
//!
//! Ride assignment uses a two-round handshake. While available, the first probe is always
//! rejected but arms the interest flag; the next probe seen while interested is accepted
//! and commits the cab. Commands are applied strictly in arrival order, so two probes can
//! never race on the flag.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{CabConfig, HandshakeCorrelation, LifecyclePolicy};
use crate::ids::{CabId, Location, RideId, Seq};
use crate::messages::{
    CabCommand, CoordinatorMessage, DispatcherNotice, RideCompleted, RideCountResult,
    RideRequest, RideRequestResult,
};
use crate::reply::ReplyHandle;
use crate::shard::{selector_for, DispatcherShards, ShardSelector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CabStatus {
    Available,
    Committed,
    OnRide,
    SignedOut,
}

/// The ride a cab has committed to. Only present while `Committed` or `OnRide`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRide {
    pub ride_id: RideId,
    pub pickup: Location,
    pub dropoff: Location,
    pub coordinator: ReplyHandle<CoordinatorMessage>,
}

/// Point-in-time copy of a cab's state for logs and run summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CabSnapshot {
    pub cab_id: CabId,
    pub status: CabStatus,
    pub interested: bool,
    pub last_location: Option<Location>,
    pub completed_rides: u64,
    pub active_ride_id: Option<RideId>,
    pub next_seq: Seq,
}

pub struct CabEntity {
    id: CabId,
    reply_seq: Seq,
    interested: bool,
    /// Ride whose probe armed the interest flag; `None` when armed by sign-in.
    interest_ride: Option<RideId>,
    status: CabStatus,
    last_location: Option<Location>,
    completed_rides: u64,
    active_ride: Option<ActiveRide>,
    config: CabConfig,
    shards: DispatcherShards,
    selector: Box<dyn ShardSelector>,
}

impl CabEntity {
    /// Creates a signed-out cab with default configuration and no dispatcher shards.
    pub fn new(id: impl Into<CabId>) -> Self {
        let config = CabConfig::default();
        Self {
            id: id.into(),
            reply_seq: 0,
            interested: false,
            interest_ride: None,
            status: CabStatus::SignedOut,
            last_location: None,
            completed_rides: 0,
            active_ride: None,
            selector: selector_for(config.shard_selection),
            config,
            shards: DispatcherShards::default(),
        }
    }

    /// Replaces the configuration and rebuilds the shard selector it names.
    pub fn with_config(mut self, config: CabConfig) -> Self {
        self.selector = selector_for(config.shard_selection);
        self.config = config;
        self
    }

    pub fn with_shards(mut self, shards: DispatcherShards) -> Self {
        self.shards = shards;
        self
    }

    /// Overrides the selector built from the configuration.
    pub fn with_selector(mut self, selector: Box<dyn ShardSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn id(&self) -> &CabId {
        &self.id
    }

    pub fn status(&self) -> CabStatus {
        self.status
    }

    pub fn is_interested(&self) -> bool {
        self.interested
    }

    pub fn last_location(&self) -> Option<Location> {
        self.last_location
    }

    pub fn completed_rides(&self) -> u64 {
        self.completed_rides
    }

    pub fn active_ride(&self) -> Option<&ActiveRide> {
        self.active_ride.as_ref()
    }

    /// Sequence number the next outbound message will carry.
    pub fn next_seq(&self) -> Seq {
        self.reply_seq
    }

    pub fn snapshot(&self) -> CabSnapshot {
        CabSnapshot {
            cab_id: self.id.clone(),
            status: self.status,
            interested: self.interested,
            last_location: self.last_location,
            completed_rides: self.completed_rides,
            active_ride_id: self.active_ride.as_ref().map(|ride| ride.ride_id),
            next_seq: self.reply_seq,
        }
    }

    pub fn handle(&mut self, command: CabCommand) {
        match command {
            CabCommand::SignIn { location } => self.on_sign_in(location),
            CabCommand::SignOut => self.on_sign_out(),
            CabCommand::RequestRide(request) => self.on_request_ride(request),
            CabCommand::RideStarted => self.on_ride_started(),
            CabCommand::RideCanceled => self.on_ride_canceled(),
            CabCommand::RideEnded => self.on_ride_ended(),
            CabCommand::NumRides { reply_to } => self.on_num_rides(&reply_to),
            CabCommand::Reset { reply_to } => self.on_reset(&reply_to),
        }
    }

    fn take_seq(&mut self) -> Seq {
        let seq = self.reply_seq;
        self.reply_seq += 1;
        seq
    }

    fn set_status(&mut self, status: CabStatus) {
        if self.status != status {
            debug!(from = ?self.status, to = ?status, "cab status changed");
        }
        self.status = status;
    }

    fn on_sign_in(&mut self, location: Location) {
        if let Some(ride) = self.active_ride.take() {
            warn!(cab_id = %self.id, ride_id = %ride.ride_id, "sign-in dropped an active ride");
        }
        self.set_status(CabStatus::Available);
        self.last_location = Some(location);
        self.completed_rides = 0;
        self.interested = self.config.handshake.interested_on_sign_in;
        self.interest_ride = None;
        info!(cab_id = %self.id, %location, "cab signed in");

        let cab_id = self.id.clone();
        self.notify_dispatcher(|seq| DispatcherNotice::CabSignedIn {
            cab_id,
            location,
            seq,
        });
    }

    fn on_sign_out(&mut self) {
        if let Some(ride) = self.active_ride.take() {
            warn!(cab_id = %self.id, ride_id = %ride.ride_id, "sign-out abandoned an active ride");
        }
        self.set_status(CabStatus::SignedOut);
        info!(cab_id = %self.id, "cab signed out");

        let cab_id = self.id.clone();
        self.notify_dispatcher(|seq| DispatcherNotice::CabSignedOut { cab_id, seq });
    }

    /// Sends a one-way notification to one shard. Nothing is awaited or retried.
    /// A sequence number is only used when a notification actually goes out.
    fn notify_dispatcher(&mut self, build: impl FnOnce(Seq) -> DispatcherNotice) {
        if self.shards.is_empty() {
            warn!(cab_id = %self.id, "no dispatcher shards registered, notification dropped");
            return;
        }
        let index = self.selector.select(&self.id, self.shards.len());
        let Some(shard) = self.shards.get(index).cloned() else {
            warn!(cab_id = %self.id, shard = index, "shard selector returned an index out of range");
            return;
        };
        let seq = self.take_seq();
        if !shard.tell(build(seq)) {
            warn!(cab_id = %self.id, shard = index, seq, "dispatcher shard is gone");
        }
    }

    fn on_request_ride(&mut self, request: RideRequest) {
        if self.status != CabStatus::Available {
            self.answer_probe(&request.reply_to, false);
            return;
        }

        if !self.interested {
            self.interested = true;
            self.interest_ride = Some(request.ride_id);
            debug!(ride_id = %request.ride_id, "first probe, interest armed");
            self.answer_probe(&request.reply_to, false);
            return;
        }

        if self.config.handshake.correlation == HandshakeCorrelation::SameRide {
            if let Some(armed_for) = self.interest_ride {
                if armed_for != request.ride_id {
                    debug!(
                        armed_for = %armed_for,
                        ride_id = %request.ride_id,
                        "probe for another ride, interest moved"
                    );
                    self.interest_ride = Some(request.ride_id);
                    self.answer_probe(&request.reply_to, false);
                    return;
                }
            }
        }

        self.interested = false;
        self.interest_ride = None;
        self.set_status(CabStatus::Committed);
        debug!(ride_id = %request.ride_id, "ride accepted");
        self.answer_probe(&request.reply_to, true);
        self.active_ride = Some(ActiveRide {
            ride_id: request.ride_id,
            pickup: request.pickup,
            dropoff: request.dropoff,
            coordinator: request.reply_to,
        });
    }

    fn answer_probe(&mut self, reply_to: &ReplyHandle<CoordinatorMessage>, accepted: bool) {
        let seq = self.take_seq();
        let result = CoordinatorMessage::RideRequestResult(RideRequestResult { accepted, seq });
        if !reply_to.tell(result) {
            debug!(seq, accepted, "probe sender is gone");
        }
    }

    /// `true` when the command may proceed under the configured lifecycle policy.
    fn lifecycle_allowed(&self, command: &'static str, expected: &[CabStatus]) -> bool {
        if expected.contains(&self.status) {
            return true;
        }
        match self.config.lifecycle {
            LifecyclePolicy::Strict => {
                warn!(cab_id = %self.id, command, status = ?self.status, "lifecycle command ignored");
                false
            }
            LifecyclePolicy::Permissive => {
                debug!(command, status = ?self.status, "lifecycle command applied outside expected state");
                true
            }
        }
    }

    fn on_ride_started(&mut self) {
        if self.lifecycle_allowed("ride_started", &[CabStatus::Committed]) {
            self.set_status(CabStatus::OnRide);
        }
    }

    fn on_ride_canceled(&mut self) {
        if self.lifecycle_allowed("ride_canceled", &[CabStatus::Committed, CabStatus::OnRide]) {
            self.active_ride = None;
            self.set_status(CabStatus::Available);
        }
    }

    fn on_ride_ended(&mut self) {
        if !self.lifecycle_allowed("ride_ended", &[CabStatus::OnRide]) {
            return;
        }
        self.set_status(CabStatus::Available);
        self.completed_rides += 1;

        let Some(ride) = self.active_ride.take() else {
            warn!(cab_id = %self.id, "ride ended without an active ride, no coordinator to notify");
            return;
        };
        self.last_location = Some(ride.dropoff);
        let seq = self.take_seq();
        if !ride
            .coordinator
            .tell(CoordinatorMessage::RideCompleted(RideCompleted { seq }))
        {
            warn!(cab_id = %self.id, ride_id = %ride.ride_id, seq, "ride coordinator is gone");
        }
        debug!(ride_id = %ride.ride_id, completed_rides = self.completed_rides, "ride completed");
    }

    fn on_num_rides(&mut self, reply_to: &ReplyHandle<RideCountResult>) {
        let count = self.completed_rides;
        self.reply_count(reply_to, count);
    }

    fn on_reset(&mut self, reply_to: &ReplyHandle<RideCountResult>) {
        let count = self.completed_rides;
        self.reply_count(reply_to, count);

        if self.status == CabStatus::OnRide {
            self.on_ride_ended();
        }
        if self.status != CabStatus::SignedOut {
            self.on_sign_out();
        }
    }

    fn reply_count(&mut self, reply_to: &ReplyHandle<RideCountResult>, count: u64) {
        let seq = self.take_seq();
        if !reply_to.tell(RideCountResult { count, seq }) {
            debug!(seq, "ride count requester is gone");
        }
    }
}
