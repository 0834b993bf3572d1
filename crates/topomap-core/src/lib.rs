//! topomap-core: Entity records and error handling for the topomap topology tracker.
//!
//! This crate provides the foundational types shared by the graph store and
//! the reconciliation controller:
//! - Identity keys (datapath IDs, port numbers, directional link keys)
//! - Typed attribute bags with an ordered extension map
//! - Switch, Port and Link records behind the `Identifiable` / `Mergeable` traits
//! - Typed status payloads as reported by the discovery subsystem
//! - Common error types

pub mod attributes;
pub mod entity;
pub mod error;
pub mod keys;
pub mod status;

pub use attributes::{attrs_from_value, up_flag, AttrMap, Attributes};
pub use entity::{EntityKind, Identifiable, Link, Mergeable, Port, Switch, UpdateOutcome};
pub use error::{Result, TopologyError};
pub use keys::{Dpid, LinkKey, PortKey, PortNo};
