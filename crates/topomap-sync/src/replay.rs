//! Drive a controller from a fixture over an mpsc channel.
//!
//! All mutation happens on the calling task: the channel client spawns one
//! delivery task per bulk reply and this loop drains the channel until the
//! graph is ready, then pushes the fixture's live events through the same
//! channel and drains them too.

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::{Duration, Instant};

use crate::config::SyncConfig;
use crate::controller::ReconciliationController;
use crate::discovery::{ChannelDiscoveryClient, DiscoveryMessage};
use crate::error::{DiscoveryError, Result, SyncError};
use crate::fixture::Fixture;

/// Reconcile `fixture` and apply its events, returning the controller.
///
/// Fails with [`SyncError::Timeout`] if the snapshot replies and events have
/// not all been applied within `reply_timeout_ms`.
pub async fn replay(
    fixture: Fixture,
    config: &SyncConfig,
) -> Result<ReconciliationController<ChannelDiscoveryClient>> {
    let (snapshot, events) = fixture.into_parts();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let client = ChannelDiscoveryClient::new(
        snapshot,
        tx.clone(),
        Duration::from_millis(config.replay_jitter_ms),
    );
    let mut controller = ReconciliationController::new(client, config);
    let deadline = Instant::now() + Duration::from_millis(config.reply_timeout_ms);

    controller.rebuild()?;
    while !controller.is_ready() {
        let message = next_message(&mut rx, deadline, config).await?;
        dispatch_logged(&mut controller, message);
    }

    let mut pending = 0usize;
    for event in events {
        tx.send(event.into_message()?)
            .map_err(|_| DiscoveryError::ChannelClosed)?;
        pending += 1;
    }
    tracing::info!(events = pending, "Replaying live events");

    while pending > 0 {
        let message = next_message(&mut rx, deadline, config).await?;
        if message.is_incremental() {
            pending -= 1;
        }
        dispatch_logged(&mut controller, message);
    }

    Ok(controller)
}

async fn next_message(
    rx: &mut UnboundedReceiver<DiscoveryMessage>,
    deadline: Instant,
    config: &SyncConfig,
) -> Result<DiscoveryMessage> {
    match tokio::time::timeout_at(deadline, rx.recv()).await {
        Ok(Some(message)) => Ok(message),
        Ok(None) => Err(DiscoveryError::ChannelClosed.into()),
        Err(_) => Err(SyncError::Timeout {
            waited_ms: config.reply_timeout_ms,
        }),
    }
}

fn dispatch_logged(
    controller: &mut ReconciliationController<ChannelDiscoveryClient>,
    message: DiscoveryMessage,
) {
    let kind = message.kind();
    if let Err(e) = controller.dispatch(message) {
        tracing::warn!(kind = %kind, error = %e, "Skipping invalid status event");
    }
}
