use std::fmt;

use crate::ids::CabId;

/// Errors raised while loading or validating a [crate::config::CabConfig].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io(String),
    InvalidFormat(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(message) => write!(f, "config io error: {message}"),
            ConfigError::InvalidFormat(message) => write!(f, "invalid config format: {message}"),
            ConfigError::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors seen by callers talking to a running cab task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CabError {
    /// The cab task has exited and its inbox is closed.
    Stopped(CabId),
    /// The cab dropped the reply handle without answering.
    NoReply(CabId),
}

impl fmt::Display for CabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CabError::Stopped(cab_id) => write!(f, "cab {cab_id} is no longer running"),
            CabError::NoReply(cab_id) => write!(f, "cab {cab_id} closed the reply channel"),
        }
    }
}

impl std::error::Error for CabError {}
