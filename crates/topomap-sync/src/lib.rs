//! topomap-sync: keeps the topology graph in step with the discovery subsystem.
//!
//! Requests bulk switch, port and link snapshots, folds them and live status
//! events into one graph, and reports when the graph is ready. Also ships the
//! `topomap-replay` tool, which drives the controller from a JSON fixture.

pub mod config;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod fixture;
pub mod history;
pub mod replay;

pub use config::SyncConfig;
pub use controller::{ReadyHandler, Readiness, ReconciliationController, ReplyOutcome};
pub use discovery::{
    ChannelDiscoveryClient, DiscoveryClient, DiscoveryMessage, Epoch, StatusSnapshot,
};
pub use error::{DiscoveryError, Result, SyncError};
pub use fixture::{Fixture, FixtureEvent};
pub use history::{ChangeHistory, ChangeId, ChangeRecord, ChangeSource};
pub use replay::replay;
