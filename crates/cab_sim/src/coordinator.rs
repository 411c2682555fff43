//! Demonstration ride coordinator.
//!
//! Walks a list of candidate cabs, probing each with the two-round handshake, then drives
//! the accepted ride to completion or cancellation. Each cab gets its own reply mailbox so
//! a late answer from one cab can never be mistaken for another's.

use std::time::Duration;

use cab_core::error::ConfigError;
use cab_core::ids::{CabId, Location, RideId};
use cab_core::messages::{CoordinatorMessage, RideRequestResult};
use cab_core::reply::{Mailbox, ReplyHandle};
use cab_core::runtime::CabHandle;
use cab_core::sequence::{SeqObservation, SequenceTracker};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Probes sent to one cab before moving on. Two covers a cab whose interest is unarmed.
    pub probes_per_cab: u32,
    /// How long to wait for any single cab reply.
    pub reply_timeout_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            probes_per_cab: 2,
            reply_timeout_ms: 1_000,
        }
    }
}

impl CoordinatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probes_per_cab == 0 {
            return Err(ConfigError::Invalid(
                "probes_per_cab must be at least 1".to_string(),
            ));
        }
        if self.reply_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "reply_timeout_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RideStatus {
    Completed,
    Canceled,
    /// No candidate accepted the ride.
    Unmatched,
    /// A cab accepted but stopped answering before the ride finished.
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideOutcome {
    pub ride_id: RideId,
    pub status: RideStatus,
    pub cab_id: Option<CabId>,
    pub probes: u32,
    pub rejections: u32,
    pub stale_replies: u32,
}

pub struct RideCoordinator {
    ride_id: RideId,
    pickup: Location,
    dropoff: Location,
    config: CoordinatorConfig,
    tracker: SequenceTracker,
    outcome: RideOutcome,
}

impl RideCoordinator {
    pub fn new(
        ride_id: RideId,
        pickup: Location,
        dropoff: Location,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            ride_id,
            pickup,
            dropoff,
            config,
            tracker: SequenceTracker::default(),
            outcome: RideOutcome {
                ride_id,
                status: RideStatus::Unmatched,
                cab_id: None,
                probes: 0,
                rejections: 0,
                stale_replies: 0,
            },
        }
    }

    /// Finds a cab among `candidates` and runs the ride. `cancel` ends it with
    /// `RideCanceled` right after it started instead of `RideEnded`.
    pub async fn fulfill(mut self, candidates: Vec<CabHandle>, cancel: bool) -> RideOutcome {
        for cab in candidates {
            let (reply_to, mut mailbox) = ReplyHandle::channel();
            match self.assign(&cab, &reply_to, &mut mailbox).await {
                Assignment::Accepted => {
                    self.outcome.cab_id = Some(cab.cab_id().clone());
                    self.outcome.status = self.drive(&cab, &mut mailbox, cancel).await;
                    return self.outcome;
                }
                Assignment::Declined => {}
                Assignment::TimedOut => {
                    drop(reply_to);
                    release_late_acceptance(cab, mailbox, self.ride_id);
                }
            }
        }
        debug!(ride_id = %self.ride_id, probes = self.outcome.probes, "no cab accepted the ride");
        self.outcome
    }

    async fn assign(
        &mut self,
        cab: &CabHandle,
        reply_to: &ReplyHandle<CoordinatorMessage>,
        mailbox: &mut Mailbox<CoordinatorMessage>,
    ) -> Assignment {
        for _ in 0..self.config.probes_per_cab {
            if cab
                .request_ride(self.ride_id, self.pickup, self.dropoff, reply_to.clone())
                .is_err()
            {
                return Assignment::Declined;
            }
            self.outcome.probes += 1;
            match self.next_reply(cab.cab_id(), mailbox).await {
                Ok(CoordinatorMessage::RideRequestResult(RideRequestResult {
                    accepted: true,
                    ..
                })) => return Assignment::Accepted,
                Ok(CoordinatorMessage::RideRequestResult(_)) => self.outcome.rejections += 1,
                Ok(CoordinatorMessage::RideCompleted(_)) | Err(ReplyError::Closed) => {
                    return Assignment::Declined
                }
                Err(ReplyError::TimedOut) => return Assignment::TimedOut,
            }
        }
        Assignment::Declined
    }

    async fn drive(
        &mut self,
        cab: &CabHandle,
        mailbox: &mut Mailbox<CoordinatorMessage>,
        cancel: bool,
    ) -> RideStatus {
        if cab.ride_started().is_err() {
            return RideStatus::Abandoned;
        }
        if cancel {
            return match cab.ride_canceled() {
                Ok(()) => RideStatus::Canceled,
                Err(_) => RideStatus::Abandoned,
            };
        }
        if cab.ride_ended().is_err() {
            return RideStatus::Abandoned;
        }
        match self.next_reply(cab.cab_id(), mailbox).await {
            Ok(CoordinatorMessage::RideCompleted(_)) => RideStatus::Completed,
            other => {
                warn!(ride_id = %self.ride_id, cab_id = %cab.cab_id(), reply = ?other, "ride did not complete");
                RideStatus::Abandoned
            }
        }
    }

    /// Next in-order reply from `cab_id`, skipping duplicates and stale values.
    async fn next_reply(
        &mut self,
        cab_id: &CabId,
        mailbox: &mut Mailbox<CoordinatorMessage>,
    ) -> Result<CoordinatorMessage, ReplyError> {
        let timeout = Duration::from_millis(self.config.reply_timeout_ms);
        loop {
            let message = match tokio::time::timeout(timeout, mailbox.recv()).await {
                Ok(Some(message)) => message,
                Ok(None) => return Err(ReplyError::Closed),
                Err(_) => {
                    warn!(ride_id = %self.ride_id, %cab_id, "timed out waiting for cab reply");
                    return Err(ReplyError::TimedOut);
                }
            };
            match self.tracker.observe(cab_id, message.seq()) {
                SeqObservation::Fresh { .. } => return Ok(message),
                observation => {
                    debug!(%cab_id, seq = message.seq(), ?observation, "out-of-order reply skipped");
                    self.outcome.stale_replies += 1;
                }
            }
        }
    }
}

enum Assignment {
    Accepted,
    Declined,
    /// The last probe is still queued at the cab and may yet be accepted.
    TimedOut,
}

#[derive(Debug)]
enum ReplyError {
    TimedOut,
    Closed,
}

/// Watches a mailbox the coordinator gave up on. A late acceptance on it means the cab
/// committed to this ride after all, so the cab is released with `RideCanceled`.
fn release_late_acceptance(
    cab: CabHandle,
    mut mailbox: Mailbox<CoordinatorMessage>,
    ride_id: RideId,
) {
    tokio::spawn(
        async move {
            while let Some(message) = mailbox.recv().await {
                if let CoordinatorMessage::RideRequestResult(RideRequestResult {
                    accepted: true,
                    ..
                }) = message
                {
                    info!(%ride_id, cab_id = %cab.cab_id(), "late acceptance released");
                    if cab.ride_canceled().is_err() {
                        debug!(%ride_id, cab_id = %cab.cab_id(), "cab stopped before release");
                    }
                    return;
                }
            }
        }
        .in_current_span(),
    );
}
