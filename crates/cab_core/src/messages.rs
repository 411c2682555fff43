//! Commands a cab accepts and the messages it emits.
//!
//! Outbound payloads are plain serde types so any transport can carry them. Every one of
//! them carries the sending cab's reply sequence number.

use serde::{Deserialize, Serialize};

use crate::ids::{CabId, Location, RideId, Seq};
use crate::reply::ReplyHandle;

/// One-way notification sent to a dispatcher shard on sign-in or sign-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DispatcherNotice {
    CabSignedIn {
        cab_id: CabId,
        location: Location,
        seq: Seq,
    },
    CabSignedOut {
        cab_id: CabId,
        seq: Seq,
    },
}

impl DispatcherNotice {
    pub fn cab_id(&self) -> &CabId {
        match self {
            DispatcherNotice::CabSignedIn { cab_id, .. } => cab_id,
            DispatcherNotice::CabSignedOut { cab_id, .. } => cab_id,
        }
    }

    pub fn seq(&self) -> Seq {
        match self {
            DispatcherNotice::CabSignedIn { seq, .. } => *seq,
            DispatcherNotice::CabSignedOut { seq, .. } => *seq,
        }
    }
}

/// Answer to a [RideRequest] probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideRequestResult {
    pub accepted: bool,
    pub seq: Seq,
}

/// Sent to the coordinator of the active ride once the ride has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideCompleted {
    pub seq: Seq,
}

/// Everything a cab may send to whoever probed it for a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CoordinatorMessage {
    RideRequestResult(RideRequestResult),
    RideCompleted(RideCompleted),
}

impl CoordinatorMessage {
    pub fn seq(&self) -> Seq {
        match self {
            CoordinatorMessage::RideRequestResult(result) => result.seq,
            CoordinatorMessage::RideCompleted(completed) => completed.seq,
        }
    }
}

/// Reply to `NumRides` and `Reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideCountResult {
    pub count: u64,
    pub seq: Seq,
}

#[derive(Debug, Clone)]
pub struct RideRequest {
    pub ride_id: RideId,
    pub pickup: Location,
    pub dropoff: Location,
    pub reply_to: ReplyHandle<CoordinatorMessage>,
}

#[derive(Debug, Clone)]
pub enum CabCommand {
    SignIn { location: Location },
    SignOut,
    RequestRide(RideRequest),
    RideStarted,
    RideCanceled,
    RideEnded,
    NumRides { reply_to: ReplyHandle<RideCountResult> },
    Reset { reply_to: ReplyHandle<RideCountResult> },
}

impl CabCommand {
    /// Short name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            CabCommand::SignIn { .. } => "sign_in",
            CabCommand::SignOut => "sign_out",
            CabCommand::RequestRide(_) => "request_ride",
            CabCommand::RideStarted => "ride_started",
            CabCommand::RideCanceled => "ride_canceled",
            CabCommand::RideEnded => "ride_ended",
            CabCommand::NumRides { .. } => "num_rides",
            CabCommand::Reset { .. } => "reset",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatcher_notice_serializes_with_type_tag() {
        let notice = DispatcherNotice::CabSignedIn {
            cab_id: CabId::new("cab-7"),
            location: Location(10),
            seq: 3,
        };
        let json = serde_json::to_value(&notice).expect("serialize");
        assert_eq!(json["type"], "CabSignedIn");
        assert_eq!(json["cab_id"], "cab-7");
        assert_eq!(json["location"], 10);
        assert_eq!(json["seq"], 3);
    }

    #[test]
    fn coordinator_message_exposes_sequence() {
        let accepted = CoordinatorMessage::RideRequestResult(RideRequestResult {
            accepted: true,
            seq: 4,
        });
        let completed = CoordinatorMessage::RideCompleted(RideCompleted { seq: 9 });
        assert_eq!(accepted.seq(), 4);
        assert_eq!(completed.seq(), 9);
    }
}
