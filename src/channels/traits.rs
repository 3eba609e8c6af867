use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Inbound message received from an external communication channel.
#[derive(Debug, Clone)]
pub struct ChannelInboundMessage {
    pub channel: String,
    pub room_id: String,
    pub event_id: String,
    pub sender: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

/// Outbound reply sent back to a communication channel.
#[derive(Debug, Clone)]
pub struct ChannelOutboundMessage {
    pub room_id: String,
    /// Event the reply threads off; empty for a plain room message.
    pub in_reply_to: String,
    pub body: String,
}

/// Channel adapter contract. New channels only need to implement this trait.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Stable channel identifier (e.g. `matrix`).
    fn id(&self) -> &'static str;

    /// Send a reply to the channel-specific room.
    async fn send(&self, message: ChannelOutboundMessage) -> anyhow::Result<()>;

    /// Start receiving inbound messages and forwarding them to the manager.
    /// Returns once `cancel` fires or the receiver side is dropped.
    async fn run(
        &self,
        inbound_tx: mpsc::Sender<ChannelInboundMessage>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()>;

    /// Best-effort health probe.
    async fn health_check(&self) -> anyhow::Result<bool>;
}
