//! Identity keys for switches, ports and links.
//!
//! Keys are extracted from discovery payloads once, at the boundary, and are
//! immutable from then on. Every extractor rejects a payload with a missing
//! identity field before anything is constructed.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attributes::AttrMap;
use crate::error::{Result, TopologyError};

/// Port number, unique within one switch.
pub type PortNo = u32;

/// Datapath identifier naming one switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dpid(pub u64);

impl Dpid {
    /// Extract the `dpid` identity of a switch payload.
    pub fn from_attrs(attrs: &AttrMap) -> Result<Self> {
        require_u64(attrs, "Switch", "dpid").map(Dpid)
    }
}

impl fmt::Display for Dpid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl From<u64> for Dpid {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identity of a port: the owning switch plus the port number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortKey {
    pub dpid: Dpid,
    pub portno: PortNo,
}

impl PortKey {
    pub fn new(dpid: impl Into<Dpid>, portno: PortNo) -> Self {
        Self {
            dpid: dpid.into(),
            portno,
        }
    }

    /// Extract `dpid` and `portno` from a port payload.
    pub fn from_attrs(attrs: &AttrMap) -> Result<Self> {
        let dpid = require_u64(attrs, "Port", "dpid")?;
        let portno = require_u32(attrs, "Port", "portno")?;
        Ok(Self::new(dpid, portno))
    }
}

impl fmt::Display for PortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dpid, self.portno)
    }
}

/// Directional link identity `(from_dpid, from_portno, to_dpid, to_portno)`.
///
/// Ordering is lexical over the four fields, which keeps link maps and dumps
/// stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkKey {
    pub from_dpid: Dpid,
    pub from_portno: PortNo,
    pub to_dpid: Dpid,
    pub to_portno: PortNo,
}

impl LinkKey {
    pub fn new(
        from_dpid: impl Into<Dpid>,
        from_portno: PortNo,
        to_dpid: impl Into<Dpid>,
        to_portno: PortNo,
    ) -> Self {
        Self {
            from_dpid: from_dpid.into(),
            from_portno,
            to_dpid: to_dpid.into(),
            to_portno,
        }
    }

    /// Extract the full 4-tuple from a link payload.
    pub fn from_attrs(attrs: &AttrMap) -> Result<Self> {
        let from_dpid = require_u64(attrs, "Link", "from_dpid")?;
        let from_portno = require_u32(attrs, "Link", "from_portno")?;
        let to_dpid = require_u64(attrs, "Link", "to_dpid")?;
        let to_portno = require_u32(attrs, "Link", "to_portno")?;
        Ok(Self::new(from_dpid, from_portno, to_dpid, to_portno))
    }

    /// The same link seen from the opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            from_dpid: self.to_dpid,
            from_portno: self.to_portno,
            to_dpid: self.from_dpid,
            to_portno: self.from_portno,
        }
    }

    /// Whether `dpid` is either endpoint of this link.
    pub fn touches(&self, dpid: Dpid) -> bool {
        self.from_dpid == dpid || self.to_dpid == dpid
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}:{})->({}:{})",
            self.from_dpid, self.from_portno, self.to_dpid, self.to_portno
        )
    }
}

fn require_u64(attrs: &AttrMap, entity: &'static str, key: &'static str) -> Result<u64> {
    match attrs.get(key) {
        None | Some(Value::Null) => Err(TopologyError::MissingKey { entity, key }),
        Some(v) => v.as_u64().ok_or_else(|| {
            TopologyError::InvalidPayload(format!(
                "{entity} `{key}` must be a non-negative integer, got {v}"
            ))
        }),
    }
}

fn require_u32(attrs: &AttrMap, entity: &'static str, key: &'static str) -> Result<u32> {
    let raw = require_u64(attrs, entity, key)?;
    u32::try_from(raw).map_err(|_| {
        TopologyError::InvalidPayload(format!("{entity} `{key}` out of range: {raw}"))
    })
}
