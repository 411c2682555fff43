//! Aggregated results of a harness run.

use cab_core::entity::CabSnapshot;
use cab_core::ids::CabId;
use serde::{Deserialize, Serialize};

use crate::coordinator::{RideOutcome, RideStatus};
use crate::dispatcher::ShardReport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CabRideCount {
    pub cab_id: CabId,
    pub completed_rides: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub rides_requested: usize,
    pub rides_completed: usize,
    pub rides_canceled: usize,
    pub rides_unmatched: usize,
    pub rides_abandoned: usize,
    pub probes_sent: u64,
    pub probes_rejected: u64,
    pub stale_replies: u64,
    pub stale_notices: u64,
    /// Shard entries left for cabs that have signed out elsewhere.
    pub stale_registrations: usize,
    /// Per-cab counts as reported by the final reset.
    pub cab_ride_counts: Vec<CabRideCount>,
    pub cabs: Vec<CabSnapshot>,
}

impl RunSummary {
    pub fn from_parts(
        outcomes: &[RideOutcome],
        shard_reports: &[ShardReport],
        cab_ride_counts: Vec<CabRideCount>,
        cabs: Vec<CabSnapshot>,
    ) -> Self {
        let mut summary = RunSummary {
            rides_requested: outcomes.len(),
            cab_ride_counts,
            cabs,
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome.status {
                RideStatus::Completed => summary.rides_completed += 1,
                RideStatus::Canceled => summary.rides_canceled += 1,
                RideStatus::Unmatched => summary.rides_unmatched += 1,
                RideStatus::Abandoned => summary.rides_abandoned += 1,
            }
            summary.probes_sent += u64::from(outcome.probes);
            summary.probes_rejected += u64::from(outcome.rejections);
            summary.stale_replies += u64::from(outcome.stale_replies);
        }
        for report in shard_reports {
            summary.stale_notices += report.stale_notices;
            summary.stale_registrations += report.signed_in_at_exit;
        }
        summary
    }

    /// Sum of the per-cab counts; equals `rides_completed` unless a ride was abandoned.
    pub fn total_cab_rides(&self) -> u64 {
        self.cab_ride_counts
            .iter()
            .map(|count| count.completed_rides)
            .sum()
    }
}
