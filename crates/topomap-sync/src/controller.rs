//! Reconciliation of bulk snapshots and live status events.
//!
//! [`ReconciliationController`] owns the graph and drives it from two
//! sources: the three bulk replies requested by [`rebuild`] and incremental
//! status pushes that may arrive at any time. Both go through the same
//! `update_*` path on the graph store, so an entity ends up the same no
//! matter which source delivered it or in what order.
//!
//! [`rebuild`]: ReconciliationController::rebuild

use topomap_core::{AttrMap, Dpid, EntityKind, LinkKey, PortKey, UpdateOutcome};
use topomap_graph::TopologyGraph;

use crate::config::SyncConfig;
use crate::discovery::{DiscoveryClient, DiscoveryMessage, Epoch};
use crate::error::Result;
use crate::history::{ChangeHistory, ChangeRecord, ChangeSource};

/// Called once per rebuild cycle when all three snapshots have been applied.
pub type ReadyHandler = Box<dyn FnMut(&TopologyGraph, Epoch)>;

/// How many of the three bulk snapshots have been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    NotStarted,
    PartiallyReady,
    Ready,
}

/// What happened to a bulk reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The reply matched the current epoch. `skipped` items failed validation.
    Applied { applied: usize, skipped: usize },
    /// The reply belonged to a superseded rebuild and was dropped.
    Stale,
}

pub struct ReconciliationController<C> {
    client: C,
    graph: TopologyGraph,
    epoch: Epoch,
    switches_received: bool,
    ports_received: bool,
    links_received: bool,
    /// At least one update has been applied to the current graph.
    dirty: bool,
    notify_pending: bool,
    on_ready: Option<ReadyHandler>,
    history: ChangeHistory,
    verify_on_ready: bool,
}

impl<C: DiscoveryClient> ReconciliationController<C> {
    pub fn new(client: C, config: &SyncConfig) -> Self {
        Self {
            client,
            graph: TopologyGraph::new(),
            epoch: Epoch::default(),
            switches_received: false,
            ports_received: false,
            links_received: false,
            dirty: false,
            notify_pending: false,
            on_ready: None,
            history: ChangeHistory::new(config.history_limit),
            verify_on_ready: config.verify_on_ready,
        }
    }

    pub fn with_ready_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&TopologyGraph, Epoch) + 'static,
    {
        self.set_ready_handler(handler);
        self
    }

    pub fn set_ready_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&TopologyGraph, Epoch) + 'static,
    {
        self.on_ready = Some(Box::new(handler));
    }

    // ── Rebuild ──

    /// Start a new rebuild cycle.
    ///
    /// The current graph is discarded and replaced by an empty one, the
    /// readiness flags are reset and three bulk requests are issued under a
    /// fresh epoch. All three requests are attempted; the first failure is
    /// returned.
    pub fn rebuild(&mut self) -> Result<Epoch> {
        self.graph = TopologyGraph::new();
        self.switches_received = false;
        self.ports_received = false;
        self.links_received = false;
        self.dirty = false;
        self.notify_pending = true;
        self.epoch = self.epoch.next();

        let epoch = self.epoch;
        tracing::info!(epoch = %epoch, "Rebuilding topology");

        let switches = self.client.request_all_switch_status(epoch);
        let ports = self.client.request_all_port_status(epoch);
        let links = self.client.request_all_link_status(epoch);
        switches.and(ports).and(links)?;
        Ok(epoch)
    }

    // ── Bulk replies ──

    pub fn handle_switch_reply(&mut self, epoch: Epoch, items: Vec<AttrMap>) -> ReplyOutcome {
        self.handle_reply(EntityKind::Switch, epoch, items)
    }

    pub fn handle_port_reply(&mut self, epoch: Epoch, items: Vec<AttrMap>) -> ReplyOutcome {
        self.handle_reply(EntityKind::Port, epoch, items)
    }

    pub fn handle_link_reply(&mut self, epoch: Epoch, items: Vec<AttrMap>) -> ReplyOutcome {
        self.handle_reply(EntityKind::Link, epoch, items)
    }

    fn handle_reply(
        &mut self,
        kind: EntityKind,
        epoch: Epoch,
        items: Vec<AttrMap>,
    ) -> ReplyOutcome {
        if epoch.is_initial() || epoch != self.epoch {
            tracing::warn!(
                kind = %kind,
                reply_epoch = %epoch,
                current_epoch = %self.epoch,
                "Discarding stale snapshot reply"
            );
            return ReplyOutcome::Stale;
        }

        let mut applied = 0usize;
        let mut skipped = 0usize;
        for attrs in &items {
            match self.apply(kind, attrs, ChangeSource::Snapshot) {
                Ok(_) => applied += 1,
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(kind = %kind, error = %e, "Skipping invalid snapshot item");
                }
            }
        }

        match kind {
            EntityKind::Switch => self.switches_received = true,
            EntityKind::Port => self.ports_received = true,
            EntityKind::Link => self.links_received = true,
        }
        tracing::debug!(kind = %kind, epoch = %epoch, applied, skipped, "Snapshot reply applied");

        self.notify_if_ready();
        ReplyOutcome::Applied { applied, skipped }
    }

    fn notify_if_ready(&mut self) {
        if !self.notify_pending || !self.is_ready() {
            return;
        }
        self.notify_pending = false;

        let fingerprint = self.graph.fingerprint().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to fingerprint topology");
            String::new()
        });
        tracing::info!(
            epoch = %self.epoch,
            switches = self.graph.switch_count(),
            ports = self.graph.port_count(),
            links = self.graph.link_count(),
            fingerprint = %fingerprint,
            "Topology ready"
        );

        if self.verify_on_ready {
            for violation in self.graph.check_integrity() {
                tracing::error!(epoch = %self.epoch, violation = %violation, "Integrity violation");
            }
        }

        if let Some(handler) = self.on_ready.as_mut() {
            handler(&self.graph, self.epoch);
        }
    }

    // ── Incremental events ──

    pub fn on_switch_status_update(&mut self, attrs: &AttrMap) -> Result<UpdateOutcome> {
        Ok(self.apply(EntityKind::Switch, attrs, ChangeSource::Incremental)?)
    }

    pub fn on_port_status_update(&mut self, attrs: &AttrMap) -> Result<UpdateOutcome> {
        Ok(self.apply(EntityKind::Port, attrs, ChangeSource::Incremental)?)
    }

    pub fn on_link_status_update(&mut self, attrs: &AttrMap) -> Result<UpdateOutcome> {
        Ok(self.apply(EntityKind::Link, attrs, ChangeSource::Incremental)?)
    }

    /// Route one message from the discovery subsystem.
    ///
    /// Bulk replies report their [`ReplyOutcome`]; live events return `None`.
    pub fn dispatch(&mut self, message: DiscoveryMessage) -> Result<Option<ReplyOutcome>> {
        let outcome = match message {
            DiscoveryMessage::SwitchReply { epoch, items } => {
                Some(self.handle_switch_reply(epoch, items))
            }
            DiscoveryMessage::PortReply { epoch, items } => {
                Some(self.handle_port_reply(epoch, items))
            }
            DiscoveryMessage::LinkReply { epoch, items } => {
                Some(self.handle_link_reply(epoch, items))
            }
            DiscoveryMessage::SwitchStatus(attrs) => {
                self.on_switch_status_update(&attrs)?;
                None
            }
            DiscoveryMessage::PortStatus(attrs) => {
                self.on_port_status_update(&attrs)?;
                None
            }
            DiscoveryMessage::LinkStatus(attrs) => {
                self.on_link_status_update(&attrs)?;
                None
            }
        };
        Ok(outcome)
    }

    /// The single update path shared by snapshot items and live events.
    fn apply(
        &mut self,
        kind: EntityKind,
        attrs: &AttrMap,
        source: ChangeSource,
    ) -> topomap_core::Result<UpdateOutcome> {
        let (outcome, key) = match kind {
            EntityKind::Switch => (
                self.graph.update_switch(attrs)?,
                Dpid::from_attrs(attrs)?.to_string(),
            ),
            EntityKind::Port => (
                self.graph.update_port(attrs)?,
                PortKey::from_attrs(attrs)?.to_string(),
            ),
            EntityKind::Link => (
                self.graph.update_link(attrs)?,
                LinkKey::from_attrs(attrs)?.to_string(),
            ),
        };
        self.dirty = true;
        self.history
            .record(ChangeRecord::new(self.epoch, kind, key, outcome, source));
        Ok(outcome)
    }

    // ── Accessors ──

    /// The live graph. It may be partial while a rebuild is in flight.
    pub fn current_graph(&self) -> &TopologyGraph {
        &self.graph
    }

    pub fn graph_if_up_to_date(&self) -> Option<&TopologyGraph> {
        self.is_up_to_date().then_some(&self.graph)
    }

    pub fn is_ready(&self) -> bool {
        self.switches_received && self.ports_received && self.links_received
    }

    /// Ready, and at least one update has been applied since the last rebuild.
    pub fn is_up_to_date(&self) -> bool {
        self.is_ready() && self.dirty
    }

    pub fn readiness(&self) -> Readiness {
        match (self.switches_received, self.ports_received, self.links_received) {
            (false, false, false) => Readiness::NotStarted,
            (true, true, true) => Readiness::Ready,
            _ => Readiness::PartiallyReady,
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn history(&self) -> &ChangeHistory {
        &self.history
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}
