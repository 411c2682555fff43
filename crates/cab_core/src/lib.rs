//! Cab entity for a distributed ride-matching simulation.
//!
//! [entity::CabEntity] is the state machine, [runtime] runs one per tokio task, and
//! [messages] holds the contracts exchanged with dispatcher shards and ride coordinators.

pub mod config;
pub mod entity;
pub mod error;
pub mod ids;
pub mod logging;
pub mod messages;
pub mod reply;
pub mod runtime;
pub mod sequence;
pub mod shard;
