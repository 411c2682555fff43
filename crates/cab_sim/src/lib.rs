//! Harness that runs many cab tasks against demonstration dispatcher shards and ride
//! coordinators.

pub mod coordinator;
pub mod dispatcher;
pub mod runner;
pub mod scenario;
pub mod summary;
