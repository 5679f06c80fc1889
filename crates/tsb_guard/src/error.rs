//! Error types for component construction, startup and configuration.
//!
//! Signal handlers are the boundary: they log these and move on, so one
//! entity's failure never takes down the others.

use thiserror::Error;

/// Required rig part did not show up within the bounded wait.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RigError {
    #[error("{part} not found on '{character}' after {timeout:.1}s")]
    MissingPart {
        character: String,
        part: &'static str,
        timeout: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartupError {
    /// Re-entrant start guard (host-global sentinel already set)
    #[error("This program is already running!")]
    AlreadyRunning,
    #[error("no local player to attach the agent rig to")]
    NoLocalPlayer,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}
