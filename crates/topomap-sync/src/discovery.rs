//! The seam between the controller and the discovery subsystem.
//!
//! Bulk status requests are fire-and-forget: a client only reports whether
//! the request could be issued. Replies and incremental pushes come back as
//! [`DiscoveryMessage`]s, with replies tagged by the [`Epoch`] they were
//! requested under so a superseded rebuild cannot leak into the current one.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;

use topomap_core::status::{LinkStatus, PortStatus, SwitchStatus};
use topomap_core::{AttrMap, EntityKind};

use crate::error::DiscoveryError;

/// Rebuild generation. Zero means no rebuild has been requested yet.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Epoch(pub u64);

impl Epoch {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn is_initial(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues bulk status requests to the discovery subsystem.
pub trait DiscoveryClient {
    fn request_all_switch_status(&mut self, epoch: Epoch) -> Result<(), DiscoveryError>;
    fn request_all_port_status(&mut self, epoch: Epoch) -> Result<(), DiscoveryError>;
    fn request_all_link_status(&mut self, epoch: Epoch) -> Result<(), DiscoveryError>;
}

/// Everything the discovery subsystem can deliver to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryMessage {
    SwitchReply { epoch: Epoch, items: Vec<AttrMap> },
    PortReply { epoch: Epoch, items: Vec<AttrMap> },
    LinkReply { epoch: Epoch, items: Vec<AttrMap> },
    SwitchStatus(AttrMap),
    PortStatus(AttrMap),
    LinkStatus(AttrMap),
}

impl DiscoveryMessage {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::SwitchReply { .. } | Self::SwitchStatus(_) => EntityKind::Switch,
            Self::PortReply { .. } | Self::PortStatus(_) => EntityKind::Port,
            Self::LinkReply { .. } | Self::LinkStatus(_) => EntityKind::Link,
        }
    }

    /// Whether this is a live status push rather than a bulk reply.
    pub fn is_incremental(&self) -> bool {
        matches!(
            self,
            Self::SwitchStatus(_) | Self::PortStatus(_) | Self::LinkStatus(_)
        )
    }

    /// Wrap a live status payload of the given kind.
    pub fn incremental(kind: EntityKind, attrs: AttrMap) -> Self {
        match kind {
            EntityKind::Switch => Self::SwitchStatus(attrs),
            EntityKind::Port => Self::PortStatus(attrs),
            EntityKind::Link => Self::LinkStatus(attrs),
        }
    }
}

/// The full status of the network as the discovery subsystem sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default)]
    pub switches: Vec<SwitchStatus>,
    #[serde(default)]
    pub ports: Vec<PortStatus>,
    #[serde(default)]
    pub links: Vec<LinkStatus>,
}

// ── Channel-backed client ─────────────────────────────────────────

/// Answers bulk requests from a fixed snapshot, delivering each reply into
/// an mpsc channel from its own task.
///
/// Links are delivered first and switches last, `jitter` apart, so the
/// controller sees replies in the least convenient order. Must be used from
/// inside a tokio runtime.
pub struct ChannelDiscoveryClient {
    snapshot: StatusSnapshot,
    tx: UnboundedSender<DiscoveryMessage>,
    jitter: Duration,
}

impl ChannelDiscoveryClient {
    pub fn new(
        snapshot: StatusSnapshot,
        tx: UnboundedSender<DiscoveryMessage>,
        jitter: Duration,
    ) -> Self {
        Self {
            snapshot,
            tx,
            jitter,
        }
    }

    fn deliver(
        &self,
        kind: EntityKind,
        delay: Duration,
        message: DiscoveryMessage,
    ) -> Result<(), DiscoveryError> {
        if self.tx.is_closed() {
            return Err(DiscoveryError::ChannelClosed);
        }
        let handle = Handle::try_current().map_err(|e| DiscoveryError::RequestFailed {
            kind,
            reason: e.to_string(),
        })?;

        let tx = self.tx.clone();
        handle.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if tx.send(message).is_err() {
                tracing::warn!(kind = %kind, "Discovery channel closed before reply was delivered");
            }
        });
        tracing::debug!(kind = %kind, delay_ms = delay.as_millis() as u64, "Bulk request issued");
        Ok(())
    }
}

impl DiscoveryClient for ChannelDiscoveryClient {
    fn request_all_switch_status(&mut self, epoch: Epoch) -> Result<(), DiscoveryError> {
        let items = self.snapshot.switches.iter().map(SwitchStatus::to_attrs).collect();
        self.deliver(
            EntityKind::Switch,
            self.jitter * 2,
            DiscoveryMessage::SwitchReply { epoch, items },
        )
    }

    fn request_all_port_status(&mut self, epoch: Epoch) -> Result<(), DiscoveryError> {
        let items = self.snapshot.ports.iter().map(PortStatus::to_attrs).collect();
        self.deliver(
            EntityKind::Port,
            self.jitter,
            DiscoveryMessage::PortReply { epoch, items },
        )
    }

    fn request_all_link_status(&mut self, epoch: Epoch) -> Result<(), DiscoveryError> {
        let items = self.snapshot.links.iter().map(LinkStatus::to_attrs).collect();
        self.deliver(
            EntityKind::Link,
            Duration::ZERO,
            DiscoveryMessage::LinkReply { epoch, items },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use topomap_core::status::{LinkState, SwitchState};

    fn snapshot() -> StatusSnapshot {
        StatusSnapshot {
            switches: vec![SwitchStatus::new(1, SwitchState::Up)],
            ports: Vec::new(),
            links: vec![LinkStatus::new(1, 1, 2, 1, LinkState::Up)],
        }
    }

    #[test]
    fn epoch_advances() {
        let epoch = Epoch::default();
        assert!(epoch.is_initial());
        assert_eq!(epoch.next(), Epoch(1));
        assert!(!epoch.next().is_initial());
    }

    #[test]
    fn request_outside_runtime_fails() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut client = ChannelDiscoveryClient::new(snapshot(), tx, Duration::ZERO);
        let err = client.request_all_switch_status(Epoch(1)).unwrap_err();
        assert!(matches!(
            err,
            DiscoveryError::RequestFailed {
                kind: EntityKind::Switch,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn request_on_closed_channel_fails() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut client = ChannelDiscoveryClient::new(snapshot(), tx, Duration::ZERO);
        let err = client.request_all_link_status(Epoch(1)).unwrap_err();
        assert!(matches!(err, DiscoveryError::ChannelClosed));
    }

    #[tokio::test]
    async fn replies_carry_epoch_and_links_arrive_first() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut client = ChannelDiscoveryClient::new(snapshot(), tx, Duration::from_millis(20));
        client.request_all_switch_status(Epoch(3)).unwrap();
        client.request_all_link_status(Epoch(3)).unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.kind(), EntityKind::Link);
        assert_eq!(second.kind(), EntityKind::Switch);

        match first {
            DiscoveryMessage::LinkReply { epoch, items } => {
                assert_eq!(epoch, Epoch(3));
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].get("up"), Some(&serde_json::json!(true)));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn incremental_wraps_by_kind() {
        let msg = DiscoveryMessage::incremental(EntityKind::Port, AttrMap::new());
        assert!(msg.is_incremental());
        assert_eq!(msg.kind(), EntityKind::Port);
        assert!(!DiscoveryMessage::LinkReply {
            epoch: Epoch(1),
            items: Vec::new()
        }
        .is_incremental());
    }
}
