//! Drives a fleet of cab tasks through a scenario.
//!
//! Startup order matters: shard mailboxes exist before cabs (cabs need the endpoints),
//! cabs exist before shard tasks (shards need the directory), and every cab has processed
//! its sign-in before the first ride order goes out.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use cab_core::config::{CabConfig, ShardSelectionKind};
use cab_core::entity::CabEntity;
use cab_core::error::{CabError, ConfigError};
use cab_core::ids::{CabId, Location, RideId};
use cab_core::reply::ReplyHandle;
use cab_core::runtime::{spawn_cab, CabHandle};
use cab_core::shard::DispatcherShards;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, oneshot};
use tracing::info;

use crate::dispatcher::{DispatcherShard, RideOrder};
use crate::scenario::ScenarioParams;
use crate::summary::{CabRideCount, RunSummary};

#[derive(Debug)]
pub enum SimError {
    Config(ConfigError),
    Cab(CabError),
    Task(String),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Config(error) => write!(f, "{error}"),
            SimError::Cab(error) => write!(f, "{error}"),
            SimError::Task(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for SimError {}

impl From<ConfigError> for SimError {
    fn from(error: ConfigError) -> Self {
        SimError::Config(error)
    }
}

impl From<CabError> for SimError {
    fn from(error: CabError) -> Self {
        SimError::Cab(error)
    }
}

/// Runs one scenario to completion on the current tokio runtime.
pub async fn run_scenario(params: &ScenarioParams) -> Result<RunSummary, SimError> {
    params.validate()?;
    let mut rng = StdRng::seed_from_u64(params.seed);

    let (endpoints, notice_mailboxes): (Vec<_>, Vec<_>) =
        (0..params.num_shards).map(|_| ReplyHandle::channel()).unzip();
    let shards = DispatcherShards::new(endpoints);

    let mut cabs: Vec<CabHandle> = Vec::with_capacity(params.num_cabs);
    let mut cab_tasks = Vec::with_capacity(params.num_cabs);
    for index in 0..params.num_cabs {
        let entity = CabEntity::new(CabId::new(format!("cab-{index:03}")))
            .with_config(cab_config(params, index))
            .with_shards(shards.clone());
        let (handle, join) = spawn_cab(entity);
        cabs.push(handle);
        cab_tasks.push(join);
    }
    let directory: Arc<HashMap<CabId, CabHandle>> = Arc::new(
        cabs.iter()
            .map(|cab| (cab.cab_id().clone(), cab.clone()))
            .collect(),
    );

    let mut order_senders = Vec::with_capacity(params.num_shards);
    let mut shard_tasks = Vec::with_capacity(params.num_shards);
    for (index, notices) in notice_mailboxes.into_iter().enumerate() {
        let (orders, order_receiver) = mpsc::unbounded_channel();
        let shard = DispatcherShard::new(
            index,
            directory.clone(),
            params.seed.wrapping_add(index as u64 + 1),
            params.coordinator,
        );
        shard_tasks.push(tokio::spawn(shard.run(notices, order_receiver)));
        order_senders.push(orders);
    }
    drop(directory);

    for cab in &cabs {
        cab.sign_in(Location(rng.gen_range(0..params.location_count)))?;
    }
    barrier(&cabs).await?;
    info!(cabs = cabs.len(), shards = params.num_shards, "fleet signed in");

    let mut outcomes = Vec::with_capacity(params.num_rides);
    let mut next_ride = 0usize;
    while next_ride < params.num_rides {
        let wave_end = (next_ride + params.wave_size).min(params.num_rides);
        let mut pending = Vec::with_capacity(wave_end - next_ride);
        for ride in next_ride..wave_end {
            let (done, outcome) = oneshot::channel();
            let shard = rng.gen_range(0..params.num_shards);
            let order = RideOrder {
                ride_id: RideId(ride as u64),
                pickup: Location(rng.gen_range(0..params.location_count)),
                dropoff: Location(rng.gen_range(0..params.location_count)),
                cancel: rng.gen_bool(params.cancel_probability),
                done,
            };
            order_senders[shard]
                .send(order)
                .map_err(|_| SimError::Task(format!("dispatcher shard {shard} stopped")))?;
            pending.push(outcome);
        }
        for outcome in pending {
            outcomes.push(outcome.await.map_err(|_| {
                SimError::Task("ride coordinator dropped its outcome".to_string())
            })?);
        }
        next_ride = wave_end;
    }

    let mut cab_ride_counts = Vec::with_capacity(cabs.len());
    for cab in &cabs {
        let result = cab.reset().await?;
        cab_ride_counts.push(CabRideCount {
            cab_id: cab.cab_id().clone(),
            completed_rides: result.count,
        });
    }
    // Reset replies before it signs out; wait until every sign-out has been sent.
    barrier(&cabs).await?;

    drop(order_senders);
    let mut shard_reports = Vec::with_capacity(shard_tasks.len());
    for task in shard_tasks {
        shard_reports.push(
            task.await
                .map_err(|error| SimError::Task(format!("dispatcher shard failed: {error}")))?,
        );
    }

    drop(cabs);
    let mut snapshots = Vec::with_capacity(cab_tasks.len());
    for task in cab_tasks {
        let entity = task
            .await
            .map_err(|error| SimError::Task(format!("cab task failed: {error}")))?;
        snapshots.push(entity.snapshot());
    }

    let summary = RunSummary::from_parts(&outcomes, &shard_reports, cab_ride_counts, snapshots);
    info!(
        completed = summary.rides_completed,
        canceled = summary.rides_canceled,
        unmatched = summary.rides_unmatched,
        "scenario finished"
    );
    Ok(summary)
}

/// A seeded random selector gets a distinct seed per cab so the fleet does not move in
/// lockstep across shards.
fn cab_config(params: &ScenarioParams, index: usize) -> CabConfig {
    match params.cab.shard_selection {
        ShardSelectionKind::Random { seed: Some(seed) } => {
            let seed = Some(seed.wrapping_add(index as u64));
            params
                .cab
                .with_shard_selection(ShardSelectionKind::Random { seed })
        }
        _ => params.cab,
    }
}

/// Returns once every cab has processed everything sent to it so far.
async fn barrier(cabs: &[CabHandle]) -> Result<(), CabError> {
    for cab in cabs {
        cab.num_rides().await?;
    }
    Ok(())
}
