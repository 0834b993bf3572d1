//! Configuration for the reconciliation controller and the replay tool.

use serde::Deserialize;

use crate::error::{Result, SyncError};

/// Reconciliation settings.
///
/// Loaded from the `[sync]` section of `topomap.toml` or
/// `TOPOMAP_SYNC__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Number of change records kept in memory (0 disables the history).
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// How long the replay tool waits for the graph to become ready.
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,

    /// Run the integrity check whenever the graph becomes ready.
    #[serde(default = "default_true")]
    pub verify_on_ready: bool,

    /// Per-kind delivery stagger used by the replay client.
    #[serde(default)]
    pub replay_jitter_ms: u64,
}

fn default_history_limit() -> usize {
    256
}

fn default_reply_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            reply_timeout_ms: default_reply_timeout_ms(),
            verify_on_ready: default_true(),
            replay_jitter_ms: 0,
        }
    }
}

impl SyncConfig {
    /// Load `[sync]` from `<file_prefix>.{toml,json,yaml,..}` (optional) and
    /// the environment. A missing section yields the defaults; a section
    /// that fails to deserialize is an error.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("TOPOMAP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        match cfg.get::<SyncConfig>("sync") {
            Ok(c) => Ok(c),
            Err(config::ConfigError::NotFound(_)) => Ok(SyncConfig::default()),
            Err(e) => Err(SyncError::Config(e.to_string())),
        }
    }
}
