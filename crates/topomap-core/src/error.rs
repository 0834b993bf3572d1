use thiserror::Error;

use crate::keys::{Dpid, LinkKey};

/// Top-level error type for topology records and graph mutations.
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("Mandatory key `{key}` for {entity} missing")]
    MissingKey { entity: &'static str, key: &'static str },

    #[error("Overwriting identity key `{key}` is not allowed")]
    ImmutableKey { key: String },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid value for attribute `{key}`: expected {expected}")]
    InvalidAttribute { key: String, expected: &'static str },

    #[error("dpid mismatch: {expected} expected but received {actual}")]
    DpidMismatch { expected: Dpid, actual: Dpid },

    #[error("Link {key} does not terminate at switch {dpid}")]
    LinkEndpointMismatch { dpid: Dpid, key: LinkKey },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TopologyError>;
