//! Serializable snapshot of the graph and its BLAKE3 fingerprint.
//!
//! The snapshot borrows from the graph and serializes switches, their ports
//! and link indices, and every link in the same stable order as the text
//! dump. Two graphs with equal content produce byte-identical JSON, so the
//! fingerprint is a cheap equality check across processes.

use serde::Serialize;

use topomap_core::{Attributes, Dpid, Identifiable, Link, LinkKey, Mergeable, Port, Result};

use crate::store::TopologyGraph;

/// Borrowed, serializable view of one switch.
///
/// Attributes sit under their own key so an extension attribute can never
/// shadow `ports` or the link indices.
#[derive(Debug, Serialize)]
pub struct SwitchView<'a> {
    pub dpid: Dpid,
    pub attributes: &'a Attributes,
    pub ports: Vec<&'a Port>,
    pub links_in: Vec<LinkKey>,
    pub links_out: Vec<LinkKey>,
}

/// Borrowed, serializable view of the whole graph.
#[derive(Debug, Serialize)]
pub struct GraphSnapshot<'a> {
    pub switches: Vec<SwitchView<'a>>,
    pub links: Vec<&'a Link>,
}

impl TopologyGraph {
    pub fn snapshot(&self) -> GraphSnapshot<'_> {
        let switches = self
            .switches()
            .map(|sw| SwitchView {
                dpid: sw.key(),
                attributes: sw.attributes(),
                ports: sw.ports().collect(),
                links_in: sw.links_in().iter().copied().collect(),
                links_out: sw.links_out().iter().copied().collect(),
            })
            .collect();

        GraphSnapshot {
            switches,
            links: self.links().collect(),
        }
    }

    /// Hex-encoded BLAKE3 hash of the canonical JSON snapshot.
    pub fn fingerprint(&self) -> Result<String> {
        let json = serde_json::to_vec(&self.snapshot())?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use topomap_core::{attrs_from_value, Switch};

    #[test]
    fn snapshot_json_shape() {
        let mut graph = TopologyGraph::new();
        graph
            .update_port(
                &attrs_from_value(json!({ "dpid": 1, "portno": 2, "up": true, "name": "eth2" }))
                    .unwrap(),
            )
            .unwrap();

        let value = serde_json::to_value(graph.snapshot()).unwrap();
        assert_eq!(
            value,
            json!({
                "switches": [{
                    "dpid": 1,
                    "attributes": {},
                    "ports": [{ "dpid": 1, "portno": 2, "up": true, "name": "eth2" }],
                    "links_in": [],
                    "links_out": []
                }],
                "links": []
            })
        );
    }

    #[test]
    fn extension_attributes_do_not_shadow_structure() {
        let mut graph = TopologyGraph::new();
        let mut sw = Switch::new(1);
        sw.set("up", json!(true)).unwrap();
        sw.set("ports", json!("x")).unwrap();
        sw.set("links_out", json!(7)).unwrap();
        graph.add_switch(sw);
        graph
            .update_port(&attrs_from_value(json!({ "dpid": 1, "portno": 1 })).unwrap())
            .unwrap();

        let json = serde_json::to_string(&graph.snapshot()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let switch = &value["switches"][0];
        assert_eq!(switch["ports"].as_array().map(Vec::len), Some(1));
        assert_eq!(switch["links_out"], json!([]));
        assert_eq!(
            switch["attributes"],
            json!({ "up": true, "ports": "x", "links_out": 7 })
        );
        assert_eq!(json.matches("\"ports\"").count(), 2);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let mut a = TopologyGraph::new();
        let mut b = TopologyGraph::new();
        a.add_switch(Switch::new(1));
        a.add_switch(Switch::new(2));
        b.add_switch(Switch::new(2));
        b.add_switch(Switch::new(1));
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

        b.add_switch(Switch::new(3));
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);
    }
}
