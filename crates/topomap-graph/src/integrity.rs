//! Consistency checks over the graph's cross-references.

use std::fmt;

use topomap_core::{Dpid, Identifiable, LinkKey, PortKey};

use crate::store::TopologyGraph;

/// One broken cross-reference found by [`TopologyGraph::check_integrity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    /// A stored link names an endpoint switch that does not exist.
    MissingEndpoint { key: LinkKey, dpid: Dpid },
    /// A stored link is absent from its from-switch's outbound index.
    MissingOutbound { key: LinkKey },
    /// A stored link is absent from its to-switch's inbound index.
    MissingInbound { key: LinkKey },
    /// A switch index names a link the global map does not hold.
    DanglingIndex { dpid: Dpid, key: LinkKey },
    /// A port is filed under a switch with a different dpid.
    ForeignPort { dpid: Dpid, port: PortKey },
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEndpoint { key, dpid } => {
                write!(f, "link {key} references missing switch {dpid}")
            }
            Self::MissingOutbound { key } => write!(f, "link {key} missing from outbound index"),
            Self::MissingInbound { key } => write!(f, "link {key} missing from inbound index"),
            Self::DanglingIndex { dpid, key } => {
                write!(f, "switch {dpid} indexes unknown link {key}")
            }
            Self::ForeignPort { dpid, port } => write!(f, "switch {dpid} holds foreign port {port}"),
        }
    }
}

impl TopologyGraph {
    /// Verify the cross-reference invariants. An empty result means the graph
    /// is consistent.
    pub fn check_integrity(&self) -> Vec<IntegrityViolation> {
        let mut violations = Vec::new();

        for link in self.links() {
            let key = link.key();
            match self.lookup_switch_by_dpid(key.from_dpid) {
                None => violations.push(IntegrityViolation::MissingEndpoint {
                    key,
                    dpid: key.from_dpid,
                }),
                Some(sw) if !sw.links_out().contains(&key) => {
                    violations.push(IntegrityViolation::MissingOutbound { key })
                }
                Some(_) => {}
            }
            match self.lookup_switch_by_dpid(key.to_dpid) {
                None => violations.push(IntegrityViolation::MissingEndpoint {
                    key,
                    dpid: key.to_dpid,
                }),
                Some(sw) if !sw.links_in().contains(&key) => {
                    violations.push(IntegrityViolation::MissingInbound { key })
                }
                Some(_) => {}
            }
        }

        for sw in self.switches() {
            for key in sw.link_keys() {
                if self.lookup_link_by_key(&key).is_none() {
                    violations.push(IntegrityViolation::DanglingIndex {
                        dpid: sw.dpid(),
                        key,
                    });
                }
            }
            for port in sw.ports() {
                if port.dpid() != sw.dpid() {
                    violations.push(IntegrityViolation::ForeignPort {
                        dpid: sw.dpid(),
                        port: port.key(),
                    });
                }
            }
        }

        violations
    }
}
