//! Error types for Annalist

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using Annalist Error
pub type Result<T> = std::result::Result<T, Error>;

/// Annalist error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Failed to start {driver} driver: {reason}")]
    DriverProvisioning { driver: String, reason: String },

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Invalid state: cannot handle {event} while {state}")]
    InvalidState { state: String, event: String },

    #[error("Corrupt outcome artifact {}: {reason}", path.display())]
    CorruptArtifact { path: PathBuf, reason: String },

    #[error("Cannot read outcome directory {}: {source}", path.display())]
    AggregationIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Whether an aggregation pass may skip this error and carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::CorruptArtifact { .. })
    }

    pub fn invalid_state(state: impl ToString, event: impl Into<String>) -> Self {
        Error::InvalidState {
            state: state.to_string(),
            event: event.into(),
        }
    }
}
