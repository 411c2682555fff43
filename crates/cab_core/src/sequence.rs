//! Recipient-side bookkeeping for cab reply sequence numbers.
//!
//! A cab's counter is shared by all of its recipients, so any single recipient normally
//! sees gaps. Only a value at or below the last one seen from the same cab means the
//! stream was reordered or duplicated.

use std::collections::HashMap;

use crate::ids::{CabId, Seq};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqObservation {
    /// Newer than anything seen from this cab. `skipped` counts the values in between,
    /// which went to other recipients or are still in flight.
    Fresh { skipped: Seq },
    /// Same value as the last message from this cab.
    Duplicate,
    /// Older than the last message from this cab.
    Stale { latest: Seq },
}

#[derive(Debug, Default)]
pub struct SequenceTracker {
    latest: HashMap<CabId, Seq>,
}

impl SequenceTracker {
    pub fn observe(&mut self, cab_id: &CabId, seq: Seq) -> SeqObservation {
        match self.latest.get_mut(cab_id) {
            None => {
                self.latest.insert(cab_id.clone(), seq);
                SeqObservation::Fresh { skipped: 0 }
            }
            Some(latest) if seq > *latest => {
                let skipped = seq - *latest - 1;
                *latest = seq;
                SeqObservation::Fresh { skipped }
            }
            Some(latest) if seq == *latest => SeqObservation::Duplicate,
            Some(latest) => SeqObservation::Stale { latest: *latest },
        }
    }

    pub fn latest(&self, cab_id: &CabId) -> Option<Seq> {
        self.latest.get(cab_id).copied()
    }
}
