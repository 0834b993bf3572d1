//! Text and Graphviz renderings of the graph.
//!
//! The text dump is the diagnostic format used in logs and tests. Its layout
//! is stable: switches in dpid order, each followed by its ports and the
//! peers of its inbound and outbound links, then every link once.

use std::fmt::{self, Write as _};

use topomap_core::{Identifiable, Mergeable};

use crate::store::TopologyGraph;

impl fmt::Display for TopologyGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Topology:")?;
        if self.is_empty() {
            return writeln!(f, "(Empty)");
        }

        for sw in self.switches() {
            writeln!(f, "{sw}")?;
            for port in sw.ports() {
                writeln!(f, " {port}")?;
            }
            if !sw.links_in().is_empty() {
                writeln!(f, " Links_in")?;
                for key in sw.links_in() {
                    writeln!(f, "  <= {}:{}", key.from_dpid, key.from_portno)?;
                }
            }
            if !sw.links_out().is_empty() {
                writeln!(f, " Links_out")?;
                for key in sw.links_out() {
                    writeln!(f, "  => {}:{}", key.to_dpid, key.to_portno)?;
                }
            }
        }
        for link in self.links() {
            writeln!(f, "{link}")?;
        }
        Ok(())
    }
}

impl TopologyGraph {
    /// Render the graph as a Graphviz digraph.
    ///
    /// Switches that are not reported up are dashed; unstable links are red.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph topology {\n");

        for sw in self.switches() {
            let style = if sw.is_up() { "" } else { ", style=dashed" };
            let _ = writeln!(
                out,
                "  \"{dpid}\" [label=\"{dpid}\"{style}];",
                dpid = sw.dpid()
            );
        }
        for link in self.links() {
            let key = link.key();
            let color = if link.is_unstable() { ", color=red" } else { "" };
            let _ = writeln!(
                out,
                "  \"{}\" -> \"{}\" [label=\"{}:{}\"{color}];",
                key.from_dpid, key.to_dpid, key.from_portno, key.to_portno
            );
        }

        out.push_str("}\n");
        out
    }
}
