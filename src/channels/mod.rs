//! Communication channels.
//!
//! Channel-specific adapters are pluggable behind [`ChannelAdapter`]; the
//! manager owns the inbound queue, adapter supervision, and reply routing.

pub mod matrix;
pub mod traits;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::channels::traits::{ChannelAdapter, ChannelInboundMessage, ChannelOutboundMessage};

const INBOUND_QUEUE_CAPACITY: usize = 64;
const RESTART_BACKOFF_INITIAL: Duration = Duration::from_secs(2);
const RESTART_BACKOFF_MAX: Duration = Duration::from_secs(60);

/// Produces replies to inbound channel messages.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(
        &self,
        message: &ChannelInboundMessage,
    ) -> anyhow::Result<Option<ChannelOutboundMessage>>;
}

/// Run every adapter until `cancel` fires, restarting crashed adapters
/// with exponential backoff and routing replies back to the adapter the
/// message arrived on.
pub async fn run_channels(
    adapters: Vec<Arc<dyn ChannelAdapter>>,
    handler: Arc<dyn MessageHandler>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    if adapters.is_empty() {
        anyhow::bail!("no channel adapters configured");
    }

    let by_id: HashMap<&'static str, Arc<dyn ChannelAdapter>> = adapters
        .iter()
        .map(|adapter| (adapter.id(), Arc::clone(adapter)))
        .collect();

    let (inbound_tx, mut inbound_rx) = mpsc::channel::<ChannelInboundMessage>(INBOUND_QUEUE_CAPACITY);

    let mut workers = JoinSet::new();
    for adapter in adapters {
        let tx = inbound_tx.clone();
        let cancel = cancel.clone();
        workers.spawn(async move {
            let mut backoff = RESTART_BACKOFF_INITIAL;
            loop {
                match adapter.run(tx.clone(), cancel.clone()).await {
                    Ok(()) => {
                        info!(channel = adapter.id(), "channel adapter stopped");
                        return;
                    }
                    Err(e) => {
                        warn!(
                            channel = adapter.id(),
                            error = %e,
                            retry_in_secs = backoff.as_secs(),
                            "channel adapter crashed; restarting"
                        );
                    }
                }
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(RESTART_BACKOFF_MAX);
            }
        });
    }
    drop(inbound_tx);

    info!(channels = by_id.len(), "channel runtime started");

    loop {
        let message = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            message = inbound_rx.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        let reply = match handler.handle(&message).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(
                    channel = %message.channel,
                    room = %message.room_id,
                    error = %e,
                    "message handler failed"
                );
                continue;
            }
        };

        if let Some(reply) = reply {
            let Some(adapter) = by_id.get(message.channel.as_str()) else {
                warn!(channel = %message.channel, "reply for unknown channel dropped");
                continue;
            };
            if let Err(e) = adapter.send(reply).await {
                error!(
                    channel = %message.channel,
                    room = %message.room_id,
                    error = %e,
                    "failed to send reply"
                );
            }
        }
    }

    cancel.cancel();
    while workers.join_next().await.is_some() {}
    info!("channel runtime stopped");
    Ok(())
}
