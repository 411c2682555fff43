use cab_core::entity::CabEntity;
use cab_core::ids::{Location, RideId};
use cab_core::messages::{CoordinatorMessage, DispatcherNotice, RideRequestResult};
use cab_core::reply::{Mailbox, ReplyHandle};
use cab_core::runtime::{spawn_cab, CabHandle};
use cab_core::shard::{DispatcherShards, RoundRobinShardSelector};
use tokio::task::JoinHandle;

/// A running cab wired to dispatcher shard mailboxes the test can read.
pub struct CabHarness {
    pub cab: CabHandle,
    pub join: JoinHandle<CabEntity>,
    pub shards: Vec<Mailbox<DispatcherNotice>>,
}

impl CabHarness {
    pub fn spawn(cab_id: &str, shard_count: usize) -> Self {
        Self::spawn_with(CabEntity::new(cab_id), shard_count)
    }

    /// Attaches `shard_count` shards with round-robin selection, then spawns the cab task.
    pub fn spawn_with(entity: CabEntity, shard_count: usize) -> Self {
        let (endpoints, shards): (Vec<_>, Vec<_>) =
            (0..shard_count).map(|_| ReplyHandle::channel()).unzip();
        let entity = entity
            .with_shards(DispatcherShards::new(endpoints))
            .with_selector(Box::new(RoundRobinShardSelector::default()));
        let (cab, join) = spawn_cab(entity);
        Self { cab, join, shards }
    }

    pub async fn next_notice(&mut self, shard: usize) -> DispatcherNotice {
        self.shards[shard].recv().await.expect("dispatcher notice")
    }

    /// Stops the task and returns the entity for inspection.
    pub async fn finish(self) -> CabEntity {
        drop(self.cab);
        self.join.await.expect("cab task")
    }
}

/// Stand-in for a ride coordinator: one mailbox collecting everything cabs send back.
pub struct Coordinator {
    pub handle: ReplyHandle<CoordinatorMessage>,
    pub mailbox: Mailbox<CoordinatorMessage>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        let (handle, mailbox) = ReplyHandle::channel();
        Self { handle, mailbox }
    }

    pub async fn probe(
        &mut self,
        cab: &CabHandle,
        ride: u64,
        pickup: u64,
        dropoff: u64,
    ) -> RideRequestResult {
        cab.request_ride(
            RideId(ride),
            Location(pickup),
            Location(dropoff),
            self.handle.clone(),
        )
        .expect("cab running");
        match self.next().await {
            CoordinatorMessage::RideRequestResult(result) => result,
            other => panic!("expected a probe result, got {other:?}"),
        }
    }

    pub async fn next(&mut self) -> CoordinatorMessage {
        self.mailbox.recv().await.expect("coordinator message")
    }
}
