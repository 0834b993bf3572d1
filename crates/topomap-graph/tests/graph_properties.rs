//! Property-style tests for the topology graph store.
//!
//! Each test drives the public update path with scripted payloads and checks
//! the cross-reference invariants after every mutating call.

use serde_json::{json, Value};
use topomap_core::{
    attrs_from_value, Dpid, Identifiable, LinkKey, Mergeable, PortKey, UpdateOutcome,
};
use topomap_graph::TopologyGraph;

fn switch(dpid: u64, up: bool) -> Value {
    json!({ "dpid": dpid, "up": up })
}

fn port(dpid: u64, portno: u32, up: bool) -> Value {
    json!({ "dpid": dpid, "portno": portno, "up": up, "name": format!("eth{portno}") })
}

fn link(from: (u64, u32), to: (u64, u32), up: bool) -> Value {
    json!({
        "from_dpid": from.0, "from_portno": from.1,
        "to_dpid": to.0, "to_portno": to.1,
        "up": up, "unstable": false
    })
}

#[derive(Clone, Copy)]
enum Kind {
    Switch,
    Port,
    Link,
}

fn apply(graph: &mut TopologyGraph, kind: Kind, payload: Value) -> UpdateOutcome {
    let attrs = attrs_from_value(payload).unwrap();
    let outcome = match kind {
        Kind::Switch => graph.update_switch(&attrs),
        Kind::Port => graph.update_port(&attrs),
        Kind::Link => graph.update_link(&attrs),
    }
    .unwrap();
    assert!(
        graph.check_integrity().is_empty(),
        "integrity violated: {:?}",
        graph.check_integrity()
    );
    outcome
}

/// A small ring of four switches with links in both directions.
fn ring() -> TopologyGraph {
    let mut graph = TopologyGraph::new();
    for dpid in 1..=4u64 {
        apply(&mut graph, Kind::Switch, switch(dpid, true));
        apply(&mut graph, Kind::Port, port(dpid, 1, true));
        apply(&mut graph, Kind::Port, port(dpid, 2, true));
    }
    for dpid in 1..=4u64 {
        let next = dpid % 4 + 1;
        apply(&mut graph, Kind::Link, link((dpid, 1), (next, 2), true));
        apply(&mut graph, Kind::Link, link((next, 2), (dpid, 1), true));
    }
    graph
}

#[test]
fn repeated_up_is_idempotent() {
    let once = ring();
    let mut twice = ring();
    for dpid in 1..=4u64 {
        assert_eq!(
            apply(&mut twice, Kind::Switch, switch(dpid, true)),
            UpdateOutcome::Updated
        );
        apply(&mut twice, Kind::Port, port(dpid, 1, true));
        let next = dpid % 4 + 1;
        apply(&mut twice, Kind::Link, link((dpid, 1), (next, 2), true));
    }

    assert_eq!(once, twice);
    assert_eq!(once.to_string(), twice.to_string());
    assert_eq!(twice.link_count(), 8);
}

#[test]
fn cascade_removes_inbound_and_outbound() {
    let mut graph = ring();
    // Add an extra outbound link from switch 1 to switch 3.
    apply(&mut graph, Kind::Link, link((1, 3), (3, 3), true));

    let sw = graph.lookup_switch_by_dpid(Dpid(1)).unwrap();
    let outbound = sw.links_out().len();
    let inbound = sw.links_in().len();
    assert_eq!((outbound, inbound), (3, 2));

    let before = graph.link_count();
    assert_eq!(
        apply(&mut graph, Kind::Switch, switch(1, false)),
        UpdateOutcome::Removed
    );
    assert_eq!(graph.link_count(), before - outbound - inbound);
    assert!(graph.lookup_switch_by_dpid(Dpid(1)).is_none());
    assert!(graph.links().all(|l| !l.key().touches(Dpid(1))));
}

#[test]
fn link_down_never_removes_switches() {
    let mut graph = ring();
    for dpid in 1..=4u64 {
        let next = dpid % 4 + 1;
        apply(&mut graph, Kind::Link, link((dpid, 1), (next, 2), false));
        apply(&mut graph, Kind::Link, link((next, 2), (dpid, 1), false));
    }
    assert_eq!(graph.link_count(), 0);
    assert_eq!(graph.switch_count(), 4);
    assert_eq!(graph.port_count(), 8);
}

#[test]
fn down_before_up_is_tolerated() {
    let mut graph = TopologyGraph::new();
    assert_eq!(
        apply(&mut graph, Kind::Link, link((7, 1), (8, 1), false)),
        UpdateOutcome::Ignored
    );
    assert_eq!(
        apply(&mut graph, Kind::Port, port(7, 1, false)),
        UpdateOutcome::Ignored
    );
    assert_eq!(
        apply(&mut graph, Kind::Switch, switch(7, false)),
        UpdateOutcome::Ignored
    );
    assert!(graph.is_empty());

    // Duplicate downs after a real removal are just as quiet.
    apply(&mut graph, Kind::Switch, switch(7, true));
    apply(&mut graph, Kind::Switch, switch(7, false));
    assert_eq!(
        apply(&mut graph, Kind::Switch, switch(7, false)),
        UpdateOutcome::Ignored
    );
}

#[test]
fn port_down_removes_only_that_port() {
    let mut graph = ring();
    apply(&mut graph, Kind::Port, port(2, 1, false));
    let sw = graph.lookup_switch_by_dpid(Dpid(2)).unwrap();
    assert!(sw.port(1).is_none());
    assert!(sw.port(2).is_some());
    assert_eq!(sw.links_out().len(), 2);
}

#[test]
fn switch_recreated_after_link_stub() {
    let mut graph = TopologyGraph::new();
    apply(&mut graph, Kind::Link, link((0x10, 1), (0x20, 1), true));
    let stub = graph.lookup_switch_by_dpid(Dpid(0x10)).unwrap();
    assert!(!stub.is_up());

    assert_eq!(
        apply(&mut graph, Kind::Switch, switch(0x10, true)),
        UpdateOutcome::Updated
    );
    let sw = graph.lookup_switch_by_dpid(Dpid(0x10)).unwrap();
    assert!(sw.is_up());
    assert!(sw.links_out().contains(&LinkKey::new(0x10, 1, 0x20, 1)));
}

#[test]
fn extension_attributes_pass_through() {
    let mut graph = TopologyGraph::new();
    apply(
        &mut graph,
        Kind::Port,
        json!({ "dpid": 5, "portno": 9, "up": true, "vlan": 100, "speed": "10G" }),
    );
    let port = graph.lookup_port(PortKey::new(5, 9)).unwrap();
    assert_eq!(port.get("vlan"), Some(json!(100)));
    assert_eq!(port.get("speed"), Some(json!("10G")));
}
