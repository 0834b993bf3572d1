//! The topology graph store.
//!
//! Owns every switch and link record. Switches own their ports and index the
//! keys of the links touching them; the global link map owns the link
//! records. Every mutating method leaves both sides of that cross-reference
//! consistent.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use topomap_core::{
    up_flag, AttrMap, Dpid, Identifiable, Link, LinkKey, Mergeable, Port, PortKey, Result,
    Switch, UpdateOutcome,
};

/// In-memory graph of switches, ports and links.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopologyGraph {
    switches: BTreeMap<Dpid, Switch>,
    links: BTreeMap<LinkKey, Link>,
}

impl TopologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Switches ──

    /// Store `sw` by dpid, replacing any previous record.
    ///
    /// Ports and attributes come from `sw`. Link-index entries of the record
    /// being replaced are carried over, and index entries in `sw` that name
    /// no stored link are dropped.
    pub fn add_switch(&mut self, mut sw: Switch) -> &mut Switch {
        let links = &self.links;
        sw.retain_links(|key| links.contains_key(key));

        match self.switches.entry(sw.dpid()) {
            Entry::Occupied(mut slot) => {
                sw.inherit_links(slot.get());
                slot.insert(sw);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(sw),
        }
    }

    /// Return the switch for `dpid`, creating a bare stub if absent.
    pub fn get_or_create_switch(&mut self, dpid: Dpid) -> &mut Switch {
        self.switches.entry(dpid).or_insert_with(|| {
            tracing::debug!(dpid = %dpid, "Creating stub switch");
            Switch::new(dpid)
        })
    }

    /// Remove a switch and every link with it as an endpoint.
    ///
    /// Returns the number of links removed. Absent switches are a no-op.
    pub fn del_switch_by_dpid(&mut self, dpid: Dpid) -> usize {
        let Some(sw) = self.switches.get(&dpid) else {
            return 0;
        };

        let mut removed = 0;
        for key in sw.link_keys() {
            if self.del_link_by_key(&key).is_some() {
                removed += 1;
            }
        }
        self.switches.remove(&dpid);

        tracing::debug!(dpid = %dpid, links_removed = removed, "Switch removed");
        removed
    }

    pub fn lookup_switch_by_dpid(&self, dpid: Dpid) -> Option<&Switch> {
        self.switches.get(&dpid)
    }

    /// Crate-internal: a switch's link indices only change through the store.
    pub(crate) fn lookup_switch_mut(&mut self, dpid: Dpid) -> Option<&mut Switch> {
        self.switches.get_mut(&dpid)
    }

    pub fn lookup_port(&self, key: PortKey) -> Option<&Port> {
        self.switches.get(&key.dpid)?.port(key.portno)
    }

    // ── Links ──

    /// Store `link`, creating stub switches for missing endpoints and
    /// registering its key in both endpoint indices.
    pub fn add_link(&mut self, link: Link) -> Result<&mut Link> {
        let key = link.key();
        self.get_or_create_switch(key.from_dpid).add_outbound_link(key)?;
        self.get_or_create_switch(key.to_dpid).add_inbound_link(key)?;

        match self.links.entry(key) {
            Entry::Occupied(mut slot) => {
                slot.insert(link);
                Ok(slot.into_mut())
            }
            Entry::Vacant(slot) => Ok(slot.insert(link)),
        }
    }

    /// Remove a link from the global map and from both endpoint indices.
    ///
    /// Any missing side is skipped; the removed record is returned if there
    /// was one.
    pub fn del_link_by_key(&mut self, key: &LinkKey) -> Option<Link> {
        if let Some(from) = self.switches.get_mut(&key.from_dpid) {
            from.remove_outbound_link(key);
        }
        if let Some(to) = self.switches.get_mut(&key.to_dpid) {
            to.remove_inbound_link(key);
        }
        self.links.remove(key)
    }

    pub fn lookup_link_by_key(&self, key: &LinkKey) -> Option<&Link> {
        self.links.get(key)
    }

    // ── Upsert-or-delete updates ──

    /// Apply a switch status payload.
    ///
    /// `up == true` merges into the existing record (leaving its ports and
    /// link indices alone) or creates a new one. Anything else removes the
    /// switch and cascades to its links.
    pub fn update_switch(&mut self, attrs: &AttrMap) -> Result<UpdateOutcome> {
        let dpid = Dpid::from_attrs(attrs)?;
        let outcome = if up_flag(attrs)? {
            match self.lookup_switch_mut(dpid) {
                Some(sw) => {
                    sw.merge(attrs)?;
                    UpdateOutcome::Updated
                }
                None => {
                    self.add_switch(Switch::from_attrs(attrs)?);
                    UpdateOutcome::Created
                }
            }
        } else if self.switches.contains_key(&dpid) {
            self.del_switch_by_dpid(dpid);
            UpdateOutcome::Removed
        } else {
            UpdateOutcome::Ignored
        };

        tracing::debug!(dpid = %dpid, outcome = ?outcome, "Switch status applied");
        Ok(outcome)
    }

    /// Apply a link status payload. New links create missing endpoint stubs;
    /// removing a link never removes a switch.
    pub fn update_link(&mut self, attrs: &AttrMap) -> Result<UpdateOutcome> {
        let key = LinkKey::from_attrs(attrs)?;
        let outcome = if up_flag(attrs)? {
            match self.links.get_mut(&key) {
                Some(link) => {
                    link.merge(attrs)?;
                    UpdateOutcome::Updated
                }
                None => {
                    self.add_link(Link::from_attrs(attrs)?)?;
                    UpdateOutcome::Created
                }
            }
        } else if self.del_link_by_key(&key).is_some() {
            UpdateOutcome::Removed
        } else {
            UpdateOutcome::Ignored
        };

        tracing::debug!(link = %key, outcome = ?outcome, "Link status applied");
        Ok(outcome)
    }

    /// Apply a port status payload. An "up" port creates its switch as a
    /// stub if needed; a "down" port on an unknown switch is ignored.
    pub fn update_port(&mut self, attrs: &AttrMap) -> Result<UpdateOutcome> {
        let key = PortKey::from_attrs(attrs)?;
        let outcome = if up_flag(attrs)? {
            // Validate first so a rejected payload cannot leave a stub switch behind.
            Port::from_attrs(attrs)?;
            self.get_or_create_switch(key.dpid).update_port(attrs)?
        } else {
            match self.lookup_switch_mut(key.dpid) {
                Some(sw) => sw.update_port(attrs)?,
                None => UpdateOutcome::Ignored,
            }
        };

        tracing::debug!(port = %key, outcome = ?outcome, "Port status applied");
        Ok(outcome)
    }

    // ── Inspection ──

    pub fn switches(&self) -> impl Iterator<Item = &Switch> {
        self.switches.values()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn switch_count(&self) -> usize {
        self.switches.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn port_count(&self) -> usize {
        self.switches.values().map(Switch::port_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.switches.is_empty() && self.links.is_empty()
    }
}
