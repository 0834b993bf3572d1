//! Error types for the topomap-sync crate.

use thiserror::Error;

use topomap_core::{EntityKind, TopologyError};

/// Failure to issue a request to the discovery subsystem.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Failed to request all {kind} status: {reason}")]
    RequestFailed { kind: EntityKind, reason: String },

    #[error("Discovery channel closed")]
    ChannelClosed,
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid fixture: {0}")]
    Fixture(String),

    #[error("Timed out after {waited_ms}ms waiting for discovery replies")]
    Timeout { waited_ms: u64 },
}

pub type Result<T> = std::result::Result<T, SyncError>;
