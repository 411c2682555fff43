//! Dispatcher shard registry and the selectors that pick a shard per notification.
//!
//! The registry is built once at startup and shared read-only by every cab. Which shard
//! hears about a given sign-in or sign-out is decided by an injected [ShardSelector], so
//! tests can substitute a deterministic one.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::config::ShardSelectionKind;
use crate::ids::CabId;
use crate::messages::DispatcherNotice;
use crate::reply::ReplyHandle;

/// Read-only list of dispatcher shard endpoints.
#[derive(Debug, Clone)]
pub struct DispatcherShards {
    endpoints: Arc<[ReplyHandle<DispatcherNotice>]>,
}

impl Default for DispatcherShards {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl DispatcherShards {
    pub fn new(endpoints: Vec<ReplyHandle<DispatcherNotice>>) -> Self {
        Self {
            endpoints: endpoints.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ReplyHandle<DispatcherNotice>> {
        self.endpoints.get(index)
    }
}

/// Picks the index of the shard that receives the next notification from `cab_id`.
pub trait ShardSelector: Send {
    /// `shard_count` is always greater than zero. The result must be `< shard_count`.
    fn select(&mut self, cab_id: &CabId, shard_count: usize) -> usize;
}

/// Uniform random choice; the default load-spreading strategy.
#[derive(Debug)]
pub struct RandomShardSelector {
    rng: StdRng,
}

impl RandomShardSelector {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ShardSelector for RandomShardSelector {
    fn select(&mut self, _cab_id: &CabId, shard_count: usize) -> usize {
        self.rng.gen_range(0..shard_count)
    }
}

/// Cycles through the shards in order, starting at shard 0.
#[derive(Debug, Default)]
pub struct RoundRobinShardSelector {
    cursor: usize,
}

impl ShardSelector for RoundRobinShardSelector {
    fn select(&mut self, _cab_id: &CabId, shard_count: usize) -> usize {
        let index = self.cursor % shard_count;
        self.cursor = self.cursor.wrapping_add(1);
        index
    }
}

/// Always sends a given cab to the same shard, so its sign-in and sign-out land together.
/// Uses SHA-256 of the cab id so the mapping is stable across processes and builds.
#[derive(Debug, Default)]
pub struct HashShardSelector;

impl ShardSelector for HashShardSelector {
    fn select(&mut self, cab_id: &CabId, shard_count: usize) -> usize {
        let digest = Sha256::digest(cab_id.as_str().as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        (u64::from_be_bytes(prefix) % shard_count as u64) as usize
    }
}

/// Builds the selector described by a config entry.
pub fn selector_for(kind: ShardSelectionKind) -> Box<dyn ShardSelector> {
    match kind {
        ShardSelectionKind::Random { seed: Some(seed) } => {
            Box::new(RandomShardSelector::seeded(seed))
        }
        ShardSelectionKind::Random { seed: None } => Box::new(RandomShardSelector::from_entropy()),
        ShardSelectionKind::RoundRobin => Box::new(RoundRobinShardSelector::default()),
        ShardSelectionKind::Hash => Box::new(HashShardSelector),
    }
}
