//! topomap-graph: the in-memory topology graph store.
//!
//! This crate is the single owner of switch, port and link records. All
//! graph reads and writes flow through [`TopologyGraph`] so the switch link
//! indices and the global link map never disagree.

pub mod integrity;
pub mod render;
pub mod snapshot;
pub mod store;

pub use integrity::IntegrityViolation;
pub use snapshot::GraphSnapshot;
pub use store::TopologyGraph;
