//! JSON fixtures for offline replay.
//!
//! A fixture is a status snapshot (typed switch, port and link records) plus
//! a list of live events applied once the snapshot has been reconciled:
//!
//! ```json
//! {
//!   "switches": [{ "dpid": 1, "status": "up" }],
//!   "ports": [{ "dpid": 1, "portno": 1, "name": "eth1", "status": "up" }],
//!   "links": [],
//!   "events": [{ "kind": "port", "attrs": { "dpid": 1, "portno": 1, "up": false } }]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use topomap_core::status::{LinkStatus, PortStatus, SwitchStatus};
use topomap_core::{attrs_from_value, EntityKind};

use crate::discovery::{DiscoveryMessage, StatusSnapshot};
use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub switches: Vec<SwitchStatus>,
    #[serde(default)]
    pub ports: Vec<PortStatus>,
    #[serde(default)]
    pub links: Vec<LinkStatus>,
    #[serde(default)]
    pub events: Vec<FixtureEvent>,
}

/// One live status push, as a raw attribute payload.
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureEvent {
    pub kind: EntityKind,
    pub attrs: Value,
}

impl FixtureEvent {
    pub fn into_message(self) -> Result<DiscoveryMessage> {
        let attrs = attrs_from_value(self.attrs)?;
        Ok(DiscoveryMessage::incremental(self.kind, attrs))
    }
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw).map_err(|e| match e {
            SyncError::Fixture(reason) => {
                SyncError::Fixture(format!("{}: {reason}", path.display()))
            }
            other => other,
        })
    }

    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| SyncError::Fixture(e.to_string()))
    }

    /// Split into the snapshot served to bulk requests and the live events.
    pub fn into_parts(self) -> (StatusSnapshot, Vec<FixtureEvent>) {
        let snapshot = StatusSnapshot {
            switches: self.switches,
            ports: self.ports,
            links: self.links,
        };
        (snapshot, self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topomap_core::status::{LinkState, SwitchState};

    #[test]
    fn test_parse_fixture() {
        let fixture = Fixture::parse(
            r#"{
                "switches": [{ "dpid": 1, "status": "up" }, { "dpid": 2 }],
                "links": [{ "from_dpid": 1, "from_portno": 1, "to_dpid": 2, "to_portno": 1,
                            "status": "unstable", "cost": 10 }],
                "events": [{ "kind": "switch", "attrs": { "dpid": 2, "up": false } }]
            }"#,
        )
        .unwrap();

        assert_eq!(fixture.switches[0].status, SwitchState::Up);
        assert_eq!(fixture.switches[1].status, SwitchState::Down);
        assert!(fixture.ports.is_empty());
        assert_eq!(fixture.links[0].status, LinkState::Unstable);
        assert_eq!(fixture.links[0].extra.get("cost"), Some(&serde_json::json!(10)));

        let (snapshot, events) = fixture.into_parts();
        assert_eq!(snapshot.switches.len(), 2);
        let message = events.into_iter().next().unwrap().into_message().unwrap();
        assert!(message.is_incremental());
        assert_eq!(message.kind(), EntityKind::Switch);
    }

    #[test]
    fn test_bad_status_is_rejected() {
        let err = Fixture::parse(r#"{ "switches": [{ "dpid": 1, "status": "sideways" }] }"#)
            .unwrap_err();
        assert!(matches!(err, SyncError::Fixture(_)));
    }

    #[test]
    fn test_non_object_event_is_rejected() {
        let event = FixtureEvent {
            kind: EntityKind::Link,
            attrs: serde_json::json!([1, 2]),
        };
        assert!(matches!(
            event.into_message().unwrap_err(),
            SyncError::Topology(_)
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Fixture::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, SyncError::Io(_)));
    }
}
