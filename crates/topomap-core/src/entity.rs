//! Switch, Port and Link records.
//!
//! Each record is an immutable identity plus a mutable [`Attributes`] bag.
//! Guarded access to the bag (identity keys are read-only, merges skip them)
//! is shared through the [`Identifiable`] and [`Mergeable`] traits.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attributes::{up_flag, AttrMap, Attributes};
use crate::error::{Result, TopologyError};
use crate::keys::{Dpid, LinkKey, PortKey, PortNo};

// ── Capability traits ─────────────────────────────────────────────

/// Kind of topology entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Switch,
    Port,
    Link,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Switch => "switch",
            Self::Port => "port",
            Self::Link => "link",
        })
    }
}

/// What an upsert-or-delete update did to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// The entity did not exist and was created.
    Created,
    /// The entity existed and its attributes were merged.
    Updated,
    /// The entity existed and was removed.
    Removed,
    /// A "down" for an entity that was never seen.
    Ignored,
}

/// An entity with a frozen identity.
pub trait Identifiable {
    type Key: Copy + Ord + fmt::Display;

    const KIND: EntityKind;

    fn key(&self) -> Self::Key;

    /// Whether `key` names one of this entity's identity fields.
    fn is_identity_key(key: &str) -> bool;

    /// Identity fields rendered as a payload map.
    fn identity_attrs(&self) -> AttrMap;

    /// Compact string form of the identity, e.g. `S1234`.
    fn key_str(&self) -> String;
}

/// Guarded attribute access shared by every entity.
pub trait Mergeable: Identifiable {
    fn attributes(&self) -> &Attributes;

    fn attributes_mut(&mut self) -> &mut Attributes;

    /// Read an attribute; identity keys read the identity value.
    fn get(&self, key: &str) -> Option<Value> {
        if Self::is_identity_key(key) {
            return self.identity_attrs().get(key).cloned();
        }
        self.attributes().get(key)
    }

    /// Write a non-identity attribute. Identity keys are rejected.
    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        if Self::is_identity_key(key) {
            return Err(TopologyError::ImmutableKey {
                key: key.to_string(),
            });
        }
        self.attributes_mut().set(key, value)
    }

    /// Remove a non-identity attribute. Removing an identity key does nothing.
    fn remove(&mut self, key: &str) -> Option<Value> {
        if Self::is_identity_key(key) {
            return None;
        }
        self.attributes_mut().remove(key)
    }

    /// Merge a payload into the attributes, skipping identity keys.
    fn merge(&mut self, attrs: &AttrMap) -> Result<()> {
        self.attributes_mut().merge_filtered(attrs, Self::is_identity_key)
    }

    fn is_up(&self) -> bool {
        self.attributes().up == Some(true)
    }

    /// Identity plus attributes in a deterministic order.
    fn to_attrs(&self) -> AttrMap {
        let mut out = self.identity_attrs();
        for (key, value) in self.attributes().entries() {
            out.insert(key.to_string(), value);
        }
        out
    }
}

// ── Port ──────────────────────────────────────────────────────────

/// A port on a switch, identified by `(dpid, portno)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Port {
    dpid: Dpid,
    portno: PortNo,
    #[serde(flatten)]
    attributes: Attributes,
}

impl Port {
    /// A bare port with no attributes.
    pub fn new(key: PortKey) -> Self {
        Self {
            dpid: key.dpid,
            portno: key.portno,
            attributes: Attributes::new(),
        }
    }

    /// Build a port from a payload. Fails without constructing anything when
    /// `dpid` or `portno` is missing.
    pub fn from_attrs(attrs: &AttrMap) -> Result<Self> {
        let mut port = Self::new(PortKey::from_attrs(attrs)?);
        port.merge(attrs)?;
        Ok(port)
    }

    pub fn dpid(&self) -> Dpid {
        self.dpid
    }

    pub fn portno(&self) -> PortNo {
        self.portno
    }

    pub fn is_external(&self) -> bool {
        self.attributes.external == Some(true)
    }
}

impl Identifiable for Port {
    type Key = PortKey;

    const KIND: EntityKind = EntityKind::Port;

    fn key(&self) -> PortKey {
        PortKey::new(self.dpid, self.portno)
    }

    fn is_identity_key(key: &str) -> bool {
        matches!(key, "dpid" | "portno")
    }

    fn identity_attrs(&self) -> AttrMap {
        let mut map = AttrMap::new();
        map.insert("dpid".into(), Value::from(self.dpid.0));
        map.insert("portno".into(), Value::from(self.portno));
        map
    }

    fn key_str(&self) -> String {
        format!("P{:x}-{}", self.dpid.0, self.portno)
    }
}

impl Mergeable for Port {
    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Port {} - {}", self.key(), self.attributes)
    }
}

// ── Link ──────────────────────────────────────────────────────────

/// A directional link between two switch ports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    #[serde(flatten)]
    key: LinkKey,
    #[serde(flatten)]
    attributes: Attributes,
}

impl Link {
    pub fn new(key: LinkKey) -> Self {
        Self {
            key,
            attributes: Attributes::new(),
        }
    }

    /// Build a link from a payload carrying the full 4-tuple.
    pub fn from_attrs(attrs: &AttrMap) -> Result<Self> {
        let mut link = Self::new(LinkKey::from_attrs(attrs)?);
        link.merge(attrs)?;
        Ok(link)
    }

    pub fn from_dpid(&self) -> Dpid {
        self.key.from_dpid
    }

    pub fn from_portno(&self) -> PortNo {
        self.key.from_portno
    }

    pub fn to_dpid(&self) -> Dpid {
        self.key.to_dpid
    }

    pub fn to_portno(&self) -> PortNo {
        self.key.to_portno
    }

    pub fn is_unstable(&self) -> bool {
        self.attributes.unstable == Some(true)
    }

    /// Key of the opposite-direction link between the same two ports.
    pub fn reversed_key(&self) -> LinkKey {
        self.key.reversed()
    }
}

impl Identifiable for Link {
    type Key = LinkKey;

    const KIND: EntityKind = EntityKind::Link;

    fn key(&self) -> LinkKey {
        self.key
    }

    fn is_identity_key(key: &str) -> bool {
        matches!(key, "from_dpid" | "from_portno" | "to_dpid" | "to_portno")
    }

    fn identity_attrs(&self) -> AttrMap {
        let mut map = AttrMap::new();
        map.insert("from_dpid".into(), Value::from(self.key.from_dpid.0));
        map.insert("from_portno".into(), Value::from(self.key.from_portno));
        map.insert("to_dpid".into(), Value::from(self.key.to_dpid.0));
        map.insert("to_portno".into(), Value::from(self.key.to_portno));
        map
    }

    fn key_str(&self) -> String {
        format!(
            "L{:x}-{}-{:x}-{}",
            self.key.from_dpid.0, self.key.from_portno, self.key.to_dpid.0, self.key.to_portno
        )
    }
}

impl Mergeable for Link {
    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Link {} - {}", self.key, self.attributes)
    }
}

// ── Switch ────────────────────────────────────────────────────────

/// A switch: owns its ports, and indexes the keys of links touching it.
///
/// Link records themselves are owned by the graph store; the switch only
/// holds their keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    dpid: Dpid,
    attributes: Attributes,
    ports: BTreeMap<PortNo, Port>,
    links_in: BTreeSet<LinkKey>,
    links_out: BTreeSet<LinkKey>,
}

impl Switch {
    /// A bare stub carrying only its `dpid`.
    pub fn new(dpid: impl Into<Dpid>) -> Self {
        Self {
            dpid: dpid.into(),
            attributes: Attributes::new(),
            ports: BTreeMap::new(),
            links_in: BTreeSet::new(),
            links_out: BTreeSet::new(),
        }
    }

    /// Build a switch from a payload. Fails without constructing anything
    /// when `dpid` is missing.
    pub fn from_attrs(attrs: &AttrMap) -> Result<Self> {
        let mut sw = Self::new(Dpid::from_attrs(attrs)?);
        sw.merge(attrs)?;
        Ok(sw)
    }

    pub fn dpid(&self) -> Dpid {
        self.dpid
    }

    // ── Ports ──

    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    pub fn port(&self, portno: PortNo) -> Option<&Port> {
        self.ports.get(&portno)
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    /// Store `port`, replacing any port with the same number.
    pub fn add_port(&mut self, port: Port) -> Result<&mut Port> {
        if port.dpid() != self.dpid {
            return Err(TopologyError::DpidMismatch {
                expected: self.dpid,
                actual: port.dpid(),
            });
        }
        match self.ports.entry(port.portno()) {
            Entry::Occupied(mut slot) => {
                slot.insert(port);
                Ok(slot.into_mut())
            }
            Entry::Vacant(slot) => Ok(slot.insert(port)),
        }
    }

    /// Return the port numbered `portno`, creating a bare one if absent.
    pub fn get_or_create_port(&mut self, portno: PortNo) -> &mut Port {
        let key = PortKey::new(self.dpid, portno);
        self.ports.entry(portno).or_insert_with(|| Port::new(key))
    }

    pub fn remove_port(&mut self, portno: PortNo) -> Option<Port> {
        self.ports.remove(&portno)
    }

    /// Upsert or remove one port according to the payload's `up` flag.
    pub fn update_port(&mut self, attrs: &AttrMap) -> Result<UpdateOutcome> {
        let key = PortKey::from_attrs(attrs)?;
        if key.dpid != self.dpid {
            return Err(TopologyError::DpidMismatch {
                expected: self.dpid,
                actual: key.dpid,
            });
        }
        if !up_flag(attrs)? {
            return Ok(match self.remove_port(key.portno) {
                Some(_) => UpdateOutcome::Removed,
                None => UpdateOutcome::Ignored,
            });
        }

        let created = !self.ports.contains_key(&key.portno);
        if let Err(e) = self.get_or_create_port(key.portno).merge(attrs) {
            // A rejected payload must not leave a bare port behind.
            if created {
                self.ports.remove(&key.portno);
            }
            return Err(e);
        }
        Ok(if created {
            UpdateOutcome::Created
        } else {
            UpdateOutcome::Updated
        })
    }

    // ── Link indices ──

    pub fn links_in(&self) -> &BTreeSet<LinkKey> {
        &self.links_in
    }

    pub fn links_out(&self) -> &BTreeSet<LinkKey> {
        &self.links_out
    }

    /// Every link key touching this switch, in either direction.
    pub fn link_keys(&self) -> BTreeSet<LinkKey> {
        self.links_in.union(&self.links_out).copied().collect()
    }

    pub fn add_inbound_link(&mut self, key: LinkKey) -> Result<()> {
        if key.to_dpid != self.dpid {
            return Err(TopologyError::LinkEndpointMismatch {
                dpid: self.dpid,
                key,
            });
        }
        self.links_in.insert(key);
        Ok(())
    }

    pub fn add_outbound_link(&mut self, key: LinkKey) -> Result<()> {
        if key.from_dpid != self.dpid {
            return Err(TopologyError::LinkEndpointMismatch {
                dpid: self.dpid,
                key,
            });
        }
        self.links_out.insert(key);
        Ok(())
    }

    pub fn remove_inbound_link(&mut self, key: &LinkKey) -> bool {
        self.links_in.remove(key)
    }

    pub fn remove_outbound_link(&mut self, key: &LinkKey) -> bool {
        self.links_out.remove(key)
    }

    /// Drop `key` from both indices. Returns whether anything was removed.
    pub fn remove_link(&mut self, key: &LinkKey) -> bool {
        let inbound = self.links_in.remove(key);
        let outbound = self.links_out.remove(key);
        inbound || outbound
    }

    /// Keep only the indexed link keys for which `keep` returns true.
    pub fn retain_links<F>(&mut self, mut keep: F)
    where
        F: FnMut(&LinkKey) -> bool,
    {
        self.links_in.retain(|key| keep(key));
        self.links_out.retain(|key| keep(key));
    }

    /// Carry the link indices of `previous` over to this record.
    pub fn inherit_links(&mut self, previous: &Switch) {
        self.links_in.extend(previous.links_in.iter().copied());
        self.links_out.extend(previous.links_out.iter().copied());
    }
}

impl Identifiable for Switch {
    type Key = Dpid;

    const KIND: EntityKind = EntityKind::Switch;

    fn key(&self) -> Dpid {
        self.dpid
    }

    fn is_identity_key(key: &str) -> bool {
        key == "dpid"
    }

    fn identity_attrs(&self) -> AttrMap {
        let mut map = AttrMap::new();
        map.insert("dpid".into(), Value::from(self.dpid.0));
        map
    }

    fn key_str(&self) -> String {
        format!("S{:x}", self.dpid.0)
    }
}

impl Mergeable for Switch {
    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Switch {} - {}", self.dpid, self.attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::attrs_from_value;
    use serde_json::json;

    fn attrs(v: Value) -> AttrMap {
        attrs_from_value(v).unwrap()
    }

    #[test]
    fn switch_requires_dpid() {
        let err = Switch::from_attrs(&attrs(json!({ "up": true }))).unwrap_err();
        assert!(matches!(
            err,
            TopologyError::MissingKey { entity: "Switch", key: "dpid" }
        ));
    }

    #[test]
    fn identity_write_is_rejected() {
        let mut sw = Switch::from_attrs(&attrs(json!({ "dpid": 0x1234, "up": true }))).unwrap();
        let err = sw.set("dpid", json!(0x9999)).unwrap_err();
        assert!(matches!(err, TopologyError::ImmutableKey { .. }));
        assert_eq!(sw.dpid(), Dpid(0x1234));
        assert_eq!(sw.get("dpid"), Some(json!(0x1234)));
    }

    #[test]
    fn identity_delete_is_noop() {
        let mut link = Link::from_attrs(&attrs(json!({
            "from_dpid": 1, "from_portno": 2, "to_dpid": 3, "to_portno": 4, "up": true
        })))
        .unwrap();
        assert_eq!(link.remove("to_dpid"), None);
        assert_eq!(link.to_dpid(), Dpid(3));
        assert_eq!(link.remove("up"), Some(json!(true)));
        assert!(!link.is_up());
    }

    #[test]
    fn merge_skips_identity_keys() {
        let mut port = Port::from_attrs(&attrs(json!({ "dpid": 1, "portno": 2 }))).unwrap();
        port.merge(&attrs(json!({ "dpid": 99, "portno": 7, "name": "eth0", "up": true })))
            .unwrap();
        assert_eq!(port.key(), PortKey::new(1, 2));
        assert_eq!(port.attributes().name.as_deref(), Some("eth0"));
        assert!(port.is_up());
    }

    #[test]
    fn key_strings() {
        let sw = Switch::new(0x1234);
        let port = Port::new(PortKey::new(0x1234, 42));
        let link = Link::new(LinkKey::new(0x1234, 42, 0x5678, 72));
        assert_eq!(sw.key_str(), "S1234");
        assert_eq!(port.key_str(), "P1234-42");
        assert_eq!(link.key_str(), "L1234-42-5678-72");
    }

    #[test]
    fn add_port_rejects_foreign_dpid() {
        let mut sw = Switch::new(1);
        let err = sw.add_port(Port::new(PortKey::new(2, 1))).unwrap_err();
        assert!(matches!(err, TopologyError::DpidMismatch { .. }));
        assert_eq!(sw.port_count(), 0);
    }

    #[test]
    fn update_port_upserts_and_removes() {
        let mut sw = Switch::new(1);
        let up = attrs(json!({ "dpid": 1, "portno": 3, "up": true, "name": "p3" }));
        assert_eq!(sw.update_port(&up).unwrap(), UpdateOutcome::Created);
        assert_eq!(sw.update_port(&up).unwrap(), UpdateOutcome::Updated);
        assert_eq!(sw.port(3).unwrap().attributes().name.as_deref(), Some("p3"));

        let down = attrs(json!({ "dpid": 1, "portno": 3, "up": false }));
        assert_eq!(sw.update_port(&down).unwrap(), UpdateOutcome::Removed);
        assert_eq!(sw.update_port(&down).unwrap(), UpdateOutcome::Ignored);
    }

    #[test]
    fn rejected_port_payload_creates_nothing() {
        let mut sw = Switch::new(1);
        let bad = attrs(json!({ "dpid": 1, "portno": 3, "up": true, "mac": 42 }));
        let err = sw.update_port(&bad).unwrap_err();
        assert!(matches!(err, TopologyError::InvalidAttribute { .. }));
        assert_eq!(sw.port_count(), 0);

        let good = attrs(json!({ "dpid": 1, "portno": 3, "up": true, "name": "p3" }));
        sw.update_port(&good).unwrap();
        assert!(sw.update_port(&bad).is_err());
        assert_eq!(sw.port(3).unwrap().attributes().name.as_deref(), Some("p3"));
    }

    #[test]
    fn to_attrs_renders_identity_and_attributes() {
        let port = Port::from_attrs(&attrs(json!({
            "dpid": 1, "portno": 2, "vlan": 10, "name": "eth2", "up": true
        })))
        .unwrap();
        assert_eq!(
            Value::Object(port.to_attrs()),
            json!({ "dpid": 1, "portno": 2, "up": true, "name": "eth2", "vlan": 10 })
        );
        assert_eq!(
            serde_json::to_string(&port.to_attrs()).unwrap(),
            serde_json::to_string(&port.clone().to_attrs()).unwrap()
        );
    }

    #[test]
    fn reversed_key_swaps_endpoints() {
        let link = Link::new(LinkKey::new(0x1234, 42, 0x5678, 72));
        assert_eq!(link.reversed_key(), LinkKey::new(0x5678, 72, 0x1234, 42));
        assert_eq!(Link::new(link.reversed_key()).reversed_key(), link.key());
    }

    #[test]
    fn link_indices_check_endpoints() {
        let mut sw = Switch::new(1);
        let out = LinkKey::new(1, 1, 2, 1);
        assert!(sw.add_outbound_link(out).is_ok());
        assert!(sw.add_inbound_link(out).is_err());
        assert_eq!(sw.links_out().len(), 1);
        assert!(sw.remove_link(&out));
        assert!(!sw.remove_link(&out));
    }

    #[test]
    fn display_renders_identity_then_attributes() {
        let link = Link::from_attrs(&attrs(json!({
            "from_dpid": 0x1234, "from_portno": 42, "to_dpid": 0x5678, "to_portno": 72,
            "up": true, "unstable": false
        })))
        .unwrap();
        assert_eq!(
            link.to_string(),
            "Link (0x1234:42)->(0x5678:72) - {up=true, unstable=false}"
        );
    }

    #[test]
    fn port_serializes_flat() {
        let port = Port::from_attrs(&attrs(json!({
            "dpid": 1, "portno": 2, "up": true, "external": 1
        })))
        .unwrap();
        assert!(port.is_external());
        assert_eq!(
            serde_json::to_value(&port).unwrap(),
            json!({ "dpid": 1, "portno": 2, "up": true, "external": true })
        );
    }
}
