//! Typed attribute bags.
//!
//! Discovery payloads are open key/value maps. The handful of keys the
//! discovery subsystem always reports get typed fields; everything else is
//! passed through untouched in an ordered extension map.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TopologyError};

/// Raw key/value payload as delivered by the discovery subsystem.
pub type AttrMap = serde_json::Map<String, Value>;

/// Unwrap a JSON payload into an attribute map, rejecting non-object shapes.
pub fn attrs_from_value(value: Value) -> Result<AttrMap> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(TopologyError::InvalidPayload(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Read the liveness flag of an update payload.
///
/// An absent or `null` flag means "down". Any non-boolean value is a
/// malformed payload and is rejected before the graph is touched.
pub fn up_flag(attrs: &AttrMap) -> Result<bool> {
    match attrs.get("up") {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(up)) => Ok(*up),
        Some(_) => Err(invalid("up", "a boolean")),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Well-known attribute keys, in rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Known {
    Up,
    Status,
    External,
    Unstable,
    Name,
    Mac,
}

impl Known {
    const ALL: [Known; 6] = [
        Known::Up,
        Known::Status,
        Known::External,
        Known::Unstable,
        Known::Name,
        Known::Mac,
    ];

    fn parse(key: &str) -> Option<Self> {
        match key {
            "up" => Some(Self::Up),
            "status" => Some(Self::Status),
            "external" => Some(Self::External),
            "unstable" => Some(Self::Unstable),
            "name" => Some(Self::Name),
            "mac" => Some(Self::Mac),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Status => "status",
            Self::External => "external",
            Self::Unstable => "unstable",
            Self::Name => "name",
            Self::Mac => "mac",
        }
    }
}

/// Non-identity attributes of a switch, port or link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<bool>,
    /// Raw status code from the discovery subsystem.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unstable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    /// Extension attributes nobody anticipated, kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one attribute by key.
    pub fn get(&self, key: &str) -> Option<Value> {
        match Known::parse(key) {
            Some(known) => self.get_known(known),
            None => self.extra.get(key).cloned(),
        }
    }

    fn get_known(&self, known: Known) -> Option<Value> {
        match known {
            Known::Up => self.up.map(Value::Bool),
            Known::Status => self.status.map(Value::from),
            Known::External => self.external.map(Value::Bool),
            Known::Unstable => self.unstable.map(Value::Bool),
            Known::Name => self.name.clone().map(Value::String),
            Known::Mac => self.mac.clone().map(Value::String),
        }
    }

    /// Write one attribute. `null` clears it.
    ///
    /// A well-known key with a value of the wrong type is rejected and the
    /// bag is left unchanged.
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let Some(known) = Known::parse(key) else {
            if value.is_null() {
                self.extra.remove(key);
            } else {
                self.extra.insert(key.to_string(), value);
            }
            return Ok(());
        };

        match known {
            Known::Up => self.up = typed_bool(key, &value)?,
            Known::Unstable => self.unstable = typed_bool(key, &value)?,
            Known::External => {
                // The discovery daemon reports `external` as 0/1.
                self.external = match &value {
                    Value::Null => None,
                    Value::Bool(b) => Some(*b),
                    Value::Number(n) => {
                        Some(n.as_i64().ok_or_else(|| invalid(key, "a boolean"))? != 0)
                    }
                    _ => return Err(invalid(key, "a boolean")),
                }
            }
            Known::Status => {
                self.status = match &value {
                    Value::Null => None,
                    v => Some(v.as_i64().ok_or_else(|| invalid(key, "an integer"))?),
                }
            }
            Known::Name => self.name = typed_string(key, value)?,
            Known::Mac => self.mac = typed_string(key, value)?,
        }
        Ok(())
    }

    /// Remove one attribute, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let previous = self.get(key);
        match Known::parse(key) {
            Some(Known::Up) => self.up = None,
            Some(Known::Status) => self.status = None,
            Some(Known::External) => self.external = None,
            Some(Known::Unstable) => self.unstable = None,
            Some(Known::Name) => self.name = None,
            Some(Known::Mac) => self.mac = None,
            None => {
                self.extra.remove(key);
            }
        }
        previous
    }

    /// Apply every entry of `attrs` for which `skip` returns false.
    ///
    /// All entries are validated before the bag changes: on error nothing
    /// has been applied.
    pub fn merge_filtered<F>(&mut self, attrs: &AttrMap, skip: F) -> Result<()>
    where
        F: Fn(&str) -> bool,
    {
        let mut staged = self.clone();
        for (key, value) in attrs {
            if skip(key) {
                continue;
            }
            staged.set(key, value.clone())?;
        }
        *self = staged;
        Ok(())
    }

    /// All present attributes in rendering order: well-known keys first,
    /// then extension keys lexically.
    pub fn entries(&self) -> Vec<(&str, Value)> {
        let mut out: Vec<(&str, Value)> = Known::ALL
            .iter()
            .filter_map(|k| self.get_known(*k).map(|v| (k.as_str(), v)))
            .collect();
        out.extend(self.extra.iter().map(|(k, v)| (k.as_str(), v.clone())));
        out
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.entries().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str("}")
    }
}

fn invalid(key: &str, expected: &'static str) -> TopologyError {
    TopologyError::InvalidAttribute {
        key: key.to_string(),
        expected,
    }
}

fn typed_bool(key: &str, value: &Value) -> Result<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        _ => Err(invalid(key, "a boolean")),
    }
}

fn typed_string(key: &str, value: Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        _ => Err(invalid(key, "a string")),
    }
}
