//! Scenario parameters for a harness run.

use std::fs;
use std::path::Path;

use cab_core::config::{CabConfig, ShardSelectionKind};
use cab_core::error::ConfigError;
use serde::{Deserialize, Serialize};

use crate::coordinator::CoordinatorConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParams {
    pub num_cabs: usize,
    pub num_shards: usize,
    pub num_rides: usize,
    /// Rides dispatched concurrently before waiting for their outcomes.
    pub wave_size: usize,
    /// Locations are drawn uniformly from `0..location_count`.
    pub location_count: u64,
    /// Probability (0.0–1.0) that a matched ride is canceled after it started.
    pub cancel_probability: f64,
    /// Seed for ride generation and shard routing of ride requests.
    pub seed: u64,
    pub coordinator: CoordinatorConfig,
    pub cab: CabConfig,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            num_cabs: 20,
            num_shards: 3,
            num_rides: 200,
            wave_size: 10,
            location_count: 100,
            cancel_probability: 0.1,
            seed: 42,
            coordinator: CoordinatorConfig::default(),
            cab: CabConfig::default(),
        }
    }
}

impl ScenarioParams {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|error| ConfigError::InvalidFormat(error.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|error| {
            ConfigError::Io(format!("failed to read {}: {error}", path.display()))
        })?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_cabs == 0 {
            return Err(ConfigError::Invalid("num_cabs must be at least 1".to_string()));
        }
        if self.num_shards == 0 {
            return Err(ConfigError::Invalid("num_shards must be at least 1".to_string()));
        }
        if self.wave_size == 0 {
            return Err(ConfigError::Invalid("wave_size must be at least 1".to_string()));
        }
        if self.location_count == 0 {
            return Err(ConfigError::Invalid(
                "location_count must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.cancel_probability) {
            return Err(ConfigError::Invalid(format!(
                "cancel_probability must be within 0.0..=1.0, got {}",
                self.cancel_probability
            )));
        }
        self.coordinator.validate()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_cabs(mut self, num_cabs: usize) -> Self {
        self.num_cabs = num_cabs;
        self
    }

    pub fn with_shards(mut self, num_shards: usize) -> Self {
        self.num_shards = num_shards;
        self
    }

    pub fn with_rides(mut self, num_rides: usize) -> Self {
        self.num_rides = num_rides;
        self
    }

    pub fn with_wave_size(mut self, wave_size: usize) -> Self {
        self.wave_size = wave_size;
        self
    }

    pub fn with_cancel_probability(mut self, probability: f64) -> Self {
        self.cancel_probability = probability;
        self
    }

    pub fn with_shard_selection(mut self, kind: ShardSelectionKind) -> Self {
        self.cab = self.cab.with_shard_selection(kind);
        self
    }

    pub fn with_cab_config(mut self, cab: CabConfig) -> Self {
        self.cab = cab;
        self
    }
}
