//! Typed status records reported by the discovery subsystem.
//!
//! The discovery daemon reports raw status codes. These records carry the
//! codes plus any extension attributes, and render themselves into the
//! attribute payloads the graph store consumes, deriving `up` and
//! `unstable` on the way.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attributes::AttrMap;
use crate::keys::PortNo;

/// Switch status codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchState {
    #[default]
    Down,
    Up,
}

impl SwitchState {
    pub fn code(self) -> i64 {
        match self {
            Self::Down => 0,
            Self::Up => 1,
        }
    }
}

/// Port status codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    #[default]
    Down,
    Up,
}

impl PortState {
    pub fn code(self) -> i64 {
        match self {
            Self::Down => 0,
            Self::Up => 1,
        }
    }
}

/// Link status codes. An unstable link is still considered up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    #[default]
    Down,
    Up,
    Unstable,
}

impl LinkState {
    pub fn code(self) -> i64 {
        match self {
            Self::Down => 0,
            Self::Up => 1,
            Self::Unstable => 2,
        }
    }
}

/// Status of one switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchStatus {
    pub dpid: u64,
    #[serde(default)]
    pub status: SwitchState,
    #[serde(flatten)]
    pub extra: AttrMap,
}

impl SwitchStatus {
    pub fn new(dpid: u64, status: SwitchState) -> Self {
        Self {
            dpid,
            status,
            extra: AttrMap::new(),
        }
    }

    pub fn to_attrs(&self) -> AttrMap {
        let mut map = self.extra.clone();
        map.insert("dpid".into(), Value::from(self.dpid));
        map.insert("status".into(), Value::from(self.status.code()));
        map.insert("up".into(), Value::Bool(self.status == SwitchState::Up));
        map
    }
}

/// Status of one switch port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortStatus {
    pub dpid: u64,
    pub portno: PortNo,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_mac")]
    pub mac: String,
    #[serde(default, deserialize_with = "flag_or_int")]
    pub external: bool,
    #[serde(default)]
    pub status: PortState,
    #[serde(flatten)]
    pub extra: AttrMap,
}

/// Accept a boolean or the daemon's 0/1 integer form.
fn flag_or_int<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(b),
        Value::Number(n) => n
            .as_i64()
            .map(|i| i != 0)
            .ok_or_else(|| serde::de::Error::custom("expected a boolean or an integer")),
        other => Err(serde::de::Error::custom(format!(
            "expected a boolean or an integer, got {other}"
        ))),
    }
}

fn default_mac() -> String {
    "00:00:00:00:00:00".to_string()
}

impl PortStatus {
    pub fn new(dpid: u64, portno: PortNo, status: PortState) -> Self {
        Self {
            dpid,
            portno,
            name: String::new(),
            mac: default_mac(),
            external: false,
            status,
            extra: AttrMap::new(),
        }
    }

    pub fn to_attrs(&self) -> AttrMap {
        let mut map = self.extra.clone();
        map.insert("dpid".into(), Value::from(self.dpid));
        map.insert("portno".into(), Value::from(self.portno));
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert("mac".into(), Value::String(self.mac.to_lowercase()));
        map.insert("external".into(), Value::Bool(self.external));
        map.insert("status".into(), Value::from(self.status.code()));
        map.insert("up".into(), Value::Bool(self.status == PortState::Up));
        map
    }
}

/// Status of one directional link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkStatus {
    pub from_dpid: u64,
    pub from_portno: PortNo,
    pub to_dpid: u64,
    pub to_portno: PortNo,
    #[serde(default)]
    pub status: LinkState,
    #[serde(flatten)]
    pub extra: AttrMap,
}

impl LinkStatus {
    pub fn new(
        from_dpid: u64,
        from_portno: PortNo,
        to_dpid: u64,
        to_portno: PortNo,
        status: LinkState,
    ) -> Self {
        Self {
            from_dpid,
            from_portno,
            to_dpid,
            to_portno,
            status,
            extra: AttrMap::new(),
        }
    }

    pub fn to_attrs(&self) -> AttrMap {
        let mut map = self.extra.clone();
        map.insert("from_dpid".into(), Value::from(self.from_dpid));
        map.insert("from_portno".into(), Value::from(self.from_portno));
        map.insert("to_dpid".into(), Value::from(self.to_dpid));
        map.insert("to_portno".into(), Value::from(self.to_portno));
        map.insert("status".into(), Value::from(self.status.code()));
        map.insert("up".into(), Value::Bool(self.status != LinkState::Down));
        map.insert(
            "unstable".into(),
            Value::Bool(self.status == LinkState::Unstable),
        );
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn switch_status_derives_up() {
        let attrs = SwitchStatus::new(0x1234, SwitchState::Up).to_attrs();
        assert_eq!(attrs.get("up"), Some(&json!(true)));
        assert_eq!(attrs.get("status"), Some(&json!(1)));

        let attrs = SwitchStatus::new(0x1234, SwitchState::Down).to_attrs();
        assert_eq!(attrs.get("up"), Some(&json!(false)));
    }

    #[test]
    fn unstable_link_is_up() {
        let attrs = LinkStatus::new(1, 1, 2, 1, LinkState::Unstable).to_attrs();
        assert_eq!(attrs.get("up"), Some(&json!(true)));
        assert_eq!(attrs.get("unstable"), Some(&json!(true)));
        assert_eq!(attrs.get("status"), Some(&json!(2)));
    }

    #[test]
    fn port_status_from_json_keeps_extensions() {
        let status: PortStatus = serde_json::from_value(json!({
            "dpid": 4660, "portno": 42, "name": "p1", "mac": "AA:BB:CC:DD:EE:FF",
            "status": "up", "vlan": 10
        }))
        .unwrap();
        let attrs = status.to_attrs();
        assert_eq!(attrs.get("mac"), Some(&json!("aa:bb:cc:dd:ee:ff")));
        assert_eq!(attrs.get("vlan"), Some(&json!(10)));
        assert_eq!(attrs.get("external"), Some(&json!(false)));
        assert_eq!(attrs.get("up"), Some(&json!(true)));
    }

    #[test]
    fn port_external_accepts_integer_flag() {
        let parse = |external: Value| {
            serde_json::from_value::<PortStatus>(json!({
                "dpid": 1, "portno": 2, "status": "up", "external": external
            }))
        };
        assert!(parse(json!(1)).unwrap().external);
        assert!(!parse(json!(0)).unwrap().external);
        assert!(parse(json!(true)).unwrap().external);
        assert!(parse(json!("yes")).is_err());

        let status = parse(json!(1)).unwrap();
        assert_eq!(status.to_attrs().get("external"), Some(&json!(true)));
        assert!(status.extra.is_empty());
    }
}
