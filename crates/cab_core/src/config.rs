//! Per-cab behavior knobs, loadable from JSON.
//!
//! Every field has a default, so `{}` is a valid configuration and partial files only
//! override what they name.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How the second probe of the acceptance handshake is matched against the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeCorrelation {
    /// Any probe arriving while interested is accepted, whoever sent it.
    #[default]
    AnyCaller,
    /// Only a probe for the ride that raised interest is accepted. A probe for another ride
    /// is rejected and moves the interest to that ride.
    SameRide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// Interest flag value right after sign-in. With `true` the first probe after
    /// sign-in is accepted immediately, as the classic cab actor does. The default
    /// departs from that: with `false` every ride, including the first one after
    /// sign-in, goes through the full two-probe handshake.
    pub interested_on_sign_in: bool,
    pub correlation: HandshakeCorrelation,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            interested_on_sign_in: false,
            correlation: HandshakeCorrelation::AnyCaller,
        }
    }
}

/// Treatment of `RideStarted` / `RideCanceled` / `RideEnded` outside their expected state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePolicy {
    /// Out-of-state lifecycle commands are dropped and logged.
    #[default]
    Strict,
    /// Lifecycle commands apply their effect whatever the current state.
    Permissive,
}

/// Strategy used to pick the dispatcher shard notified on sign-in and sign-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShardSelectionKind {
    Random {
        #[serde(default)]
        seed: Option<u64>,
    },
    RoundRobin,
    Hash,
}

impl Default for ShardSelectionKind {
    fn default() -> Self {
        ShardSelectionKind::Random { seed: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CabConfig {
    pub handshake: HandshakeConfig,
    pub lifecycle: LifecyclePolicy,
    pub shard_selection: ShardSelectionKind,
}

impl CabConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|error| ConfigError::InvalidFormat(error.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|error| {
            ConfigError::Io(format!("failed to read {}: {error}", path.display()))
        })?;
        Self::from_json_str(&contents)
    }

    pub fn with_handshake(mut self, handshake: HandshakeConfig) -> Self {
        self.handshake = handshake;
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: LifecyclePolicy) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn with_shard_selection(mut self, shard_selection: ShardSelectionKind) -> Self {
        self.shard_selection = shard_selection;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = CabConfig::from_json_str("{}").expect("config");
        assert_eq!(config, CabConfig::default());
        assert!(!config.handshake.interested_on_sign_in);
        assert_eq!(config.lifecycle, LifecyclePolicy::Strict);
        assert_eq!(config.shard_selection, ShardSelectionKind::Random { seed: None });
    }

    #[test]
    fn partial_config_overrides_named_fields() {
        let config = CabConfig::from_json_str(
            r#"{
                "handshake": { "correlation": "same_ride" },
                "lifecycle": "permissive",
                "shard_selection": { "kind": "random", "seed": 42 }
            }"#,
        )
        .expect("config");

        assert!(!config.handshake.interested_on_sign_in);
        assert_eq!(config.handshake.correlation, HandshakeCorrelation::SameRide);
        assert_eq!(config.lifecycle, LifecyclePolicy::Permissive);
        assert_eq!(
            config.shard_selection,
            ShardSelectionKind::Random { seed: Some(42) }
        );
    }

    #[test]
    fn malformed_json_is_invalid_format() {
        let error = CabConfig::from_json_str("{ not json").expect_err("should fail");
        assert!(matches!(error, ConfigError::InvalidFormat(_)));
    }

    #[test]
    fn load_reads_file_and_reports_missing_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "shard_selection": {{ "kind": "hash" }} }}"#).expect("write");

        let config = CabConfig::load(file.path()).expect("config");
        assert_eq!(config.shard_selection, ShardSelectionKind::Hash);

        let missing = file.path().with_extension("missing");
        let error = CabConfig::load(&missing).expect_err("missing file");
        assert!(matches!(error, ConfigError::Io(_)));
    }
}
