//! Bounded in-memory log of every update applied to the graph.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use topomap_core::{EntityKind, UpdateOutcome};

use crate::discovery::Epoch;

/// Unique identifier for a change record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChangeId(pub Uuid);

impl ChangeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChangeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Where an update came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    /// An item of a bulk snapshot reply.
    Snapshot,
    /// A live status push.
    Incremental,
}

/// One applied update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: ChangeId,
    pub timestamp: DateTime<Utc>,
    pub epoch: Epoch,
    pub entity: EntityKind,
    /// Rendered entity key, e.g. `0x1`, `0x1:2` or `(0x1:2)->(0x3:4)`.
    pub key: String,
    pub outcome: UpdateOutcome,
    pub source: ChangeSource,
}

impl ChangeRecord {
    pub fn new(
        epoch: Epoch,
        entity: EntityKind,
        key: String,
        outcome: UpdateOutcome,
        source: ChangeSource,
    ) -> Self {
        Self {
            id: ChangeId::new(),
            timestamp: Utc::now(),
            epoch,
            entity,
            key,
            outcome,
            source,
        }
    }
}

/// Ring of the most recent change records, oldest first.
#[derive(Debug, Clone, Default)]
pub struct ChangeHistory {
    limit: usize,
    records: VecDeque<ChangeRecord>,
}

impl ChangeHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            records: VecDeque::with_capacity(limit.min(1024)),
        }
    }

    /// Append a record, evicting the oldest when full. A zero limit
    /// discards everything.
    pub fn record(&mut self, record: ChangeRecord) {
        if self.limit == 0 {
            return;
        }
        while self.records.len() >= self.limit {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records.iter()
    }

    pub fn latest(&self) -> Option<&ChangeRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
