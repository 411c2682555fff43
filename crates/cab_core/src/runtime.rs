//! One tokio task per cab.
//!
//! The task owns its [CabEntity] outright and drains a private inbox one command at a
//! time; nothing else can reach the entity's fields. Callers only hold a [CabHandle].
//! When every handle is dropped the inbox closes, the task stops and hands the entity
//! back through its `JoinHandle`.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, info_span, trace, Instrument};

use crate::entity::CabEntity;
use crate::error::CabError;
use crate::ids::{CabId, Location, RideId};
use crate::messages::{CabCommand, CoordinatorMessage, RideCountResult, RideRequest};
use crate::reply::ReplyHandle;

/// Sending side of a cab's inbox.
#[derive(Debug, Clone)]
pub struct CabHandle {
    cab_id: CabId,
    inbox: mpsc::UnboundedSender<CabCommand>,
}

impl CabHandle {
    pub fn cab_id(&self) -> &CabId {
        &self.cab_id
    }

    pub fn is_stopped(&self) -> bool {
        self.inbox.is_closed()
    }

    /// Enqueues a command without waiting for it to be processed.
    pub fn send(&self, command: CabCommand) -> Result<(), CabError> {
        self.inbox
            .send(command)
            .map_err(|_| CabError::Stopped(self.cab_id.clone()))
    }

    pub fn sign_in(&self, location: Location) -> Result<(), CabError> {
        self.send(CabCommand::SignIn { location })
    }

    pub fn sign_out(&self) -> Result<(), CabError> {
        self.send(CabCommand::SignOut)
    }

    pub fn request_ride(
        &self,
        ride_id: RideId,
        pickup: Location,
        dropoff: Location,
        reply_to: ReplyHandle<CoordinatorMessage>,
    ) -> Result<(), CabError> {
        self.send(CabCommand::RequestRide(RideRequest {
            ride_id,
            pickup,
            dropoff,
            reply_to,
        }))
    }

    pub fn ride_started(&self) -> Result<(), CabError> {
        self.send(CabCommand::RideStarted)
    }

    pub fn ride_canceled(&self) -> Result<(), CabError> {
        self.send(CabCommand::RideCanceled)
    }

    pub fn ride_ended(&self) -> Result<(), CabError> {
        self.send(CabCommand::RideEnded)
    }

    /// Asks for the completed ride count and waits for the answer.
    pub async fn num_rides(&self) -> Result<RideCountResult, CabError> {
        let (reply_to, mut mailbox) = ReplyHandle::channel();
        self.send(CabCommand::NumRides { reply_to })?;
        mailbox
            .recv()
            .await
            .ok_or_else(|| CabError::NoReply(self.cab_id.clone()))
    }

    /// Resets the cab (finishing any ride and signing it out) and waits for the
    /// count it had before the reset.
    pub async fn reset(&self) -> Result<RideCountResult, CabError> {
        let (reply_to, mut mailbox) = ReplyHandle::channel();
        self.send(CabCommand::Reset { reply_to })?;
        mailbox
            .recv()
            .await
            .ok_or_else(|| CabError::NoReply(self.cab_id.clone()))
    }
}

/// Spawns the cab's processing loop on the current tokio runtime.
pub fn spawn_cab(entity: CabEntity) -> (CabHandle, JoinHandle<CabEntity>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let cab_id = entity.id().clone();
    let span = info_span!("cab", cab_id = %cab_id);
    let join = tokio::spawn(run_cab(entity, receiver).instrument(span));
    (
        CabHandle {
            cab_id,
            inbox: sender,
        },
        join,
    )
}

async fn run_cab(
    mut entity: CabEntity,
    mut inbox: mpsc::UnboundedReceiver<CabCommand>,
) -> CabEntity {
    info!("cab task started");
    while let Some(command) = inbox.recv().await {
        trace!(command = command.name(), "handling command");
        entity.handle(command);
    }
    info!(
        completed_rides = entity.completed_rides(),
        status = ?entity.status(),
        "cab task stopped"
    );
    entity
}
