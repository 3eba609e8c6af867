//! Matrix channel adapter over the client-server HTTP API.
//!
//! The adapter long-polls `/sync`, persists the `next_batch` token after
//! every batch so restarts resume where they left off, and replies with
//! `m.notice` events so other bots ignore it.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::channels::traits::{ChannelAdapter, ChannelInboundMessage, ChannelOutboundMessage};
use crate::config::MatrixConfig;
use crate::error::{BotError, Result};
use crate::storage::StateStore;
use crate::summary::RoomMessage;

/// Backwards `/messages` pages are capped at this size by the server.
const MAX_PAGE_SIZE: usize = 100;
/// Grace added to the HTTP timeout so the long poll is never cut short
/// by the client side.
const SYNC_HTTP_MARGIN: Duration = Duration::from_secs(30);
/// Error bodies are truncated to this many bytes in messages.
const MAX_ERROR_BODY: usize = 1024;

#[derive(Debug, Deserialize)]
struct SyncResponse {
    next_batch: String,
    #[serde(default)]
    rooms: SyncRooms,
}

#[derive(Debug, Default, Deserialize)]
struct SyncRooms {
    #[serde(default)]
    join: std::collections::HashMap<String, JoinedRoom>,
}

#[derive(Debug, Default, Deserialize)]
struct JoinedRoom {
    #[serde(default)]
    timeline: Timeline,
}

#[derive(Debug, Default, Deserialize)]
struct Timeline {
    #[serde(default)]
    events: Vec<RoomEvent>,
}

#[derive(Debug, Deserialize)]
struct RoomEvent {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    event_id: String,
    #[serde(default)]
    sender: String,
    #[serde(rename = "origin_server_ts", default)]
    timestamp_ms: i64,
    #[serde(default)]
    content: EventContent,
}

#[derive(Debug, Default, Deserialize)]
struct EventContent {
    #[serde(default)]
    msgtype: String,
    #[serde(default)]
    body: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    chunk: Vec<RoomEvent>,
    #[serde(default)]
    end: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhoamiResponse {
    user_id: String,
}

/// Adapter for a single Matrix account on one homeserver.
pub struct MatrixAdapter {
    http: reqwest::Client,
    base: String,
    user_id: String,
    token: String,
    sync_timeout: Duration,
    allowed_rooms: HashSet<String>,
    store: Arc<StateStore>,
    since: Mutex<Option<String>>,
    txn_counter: AtomicU64,
}

impl MatrixAdapter {
    pub fn new(config: &MatrixConfig, store: Arc<StateStore>) -> Result<Self> {
        let sync_timeout = config.sync_timeout();
        let http = reqwest::Client::builder()
            .timeout(sync_timeout + SYNC_HTTP_MARGIN)
            .build()
            .map_err(|e| BotError::Matrix(format!("build HTTP client: {e}")))?;
        let since = store.load_next_batch(&config.user_id)?;
        Ok(Self {
            http,
            base: config.homeserver_url.trim_end_matches('/').to_string(),
            user_id: config.user_id.clone(),
            token: config.access_token.clone(),
            sync_timeout,
            allowed_rooms: config.allowed_room_ids.iter().cloned().collect(),
            store,
            since: Mutex::new(since),
            txn_counter: AtomicU64::new(0),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Ask the homeserver who the access token belongs to.
    pub async fn whoami(&self) -> Result<String> {
        let url = format!("{}/_matrix/client/v3/account/whoami", self.base);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| BotError::Matrix(format!("whoami request: {e}")))?;
        let response = error_for_status("whoami", response).await?;
        let parsed: WhoamiResponse = response
            .json()
            .await
            .map_err(|e| BotError::Matrix(format!("decode whoami response: {e}")))?;
        Ok(parsed.user_id)
    }

    /// Fetch room text messages newer than `since`, at most `max`, oldest
    /// first. Pages backwards through `/messages` and stops as soon as an
    /// event older than the cutoff appears.
    pub async fn recent_messages(
        &self,
        room_id: &str,
        since: DateTime<Utc>,
        max: usize,
    ) -> Result<Vec<RoomMessage>> {
        if max == 0 {
            return Ok(Vec::new());
        }
        let page_size = max.min(MAX_PAGE_SIZE);
        let mut collected = Vec::new();
        let mut from: Option<String> = None;

        'pages: loop {
            let page = self.messages_page(room_id, from.as_deref(), page_size).await?;
            let mut reached_cutoff = false;
            for event in &page.chunk {
                let timestamp = millis_to_utc(event.timestamp_ms);
                if timestamp < since {
                    reached_cutoff = true;
                    break;
                }
                if !is_text_message(event) {
                    continue;
                }
                collected.push(RoomMessage {
                    sender: event.sender.clone(),
                    body: event.content.body.trim().to_string(),
                    timestamp,
                });
                if collected.len() >= max {
                    break 'pages;
                }
            }
            if reached_cutoff {
                break;
            }
            match page.end {
                Some(end) if !end.is_empty() && from.as_deref() != Some(end.as_str()) => {
                    from = Some(end);
                }
                _ => break,
            }
        }

        // Backward pagination yields newest first.
        collected.reverse();
        Ok(collected)
    }

    async fn messages_page(
        &self,
        room_id: &str,
        from: Option<&str>,
        limit: usize,
    ) -> Result<MessagesResponse> {
        let url = format!("{}/_matrix/client/v3/rooms/{room_id}/messages", self.base);
        let mut query = vec![("dir", "b".to_string()), ("limit", limit.to_string())];
        if let Some(from) = from {
            query.push(("from", from.to_string()));
        }
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&query)
            .send()
            .await
            .map_err(|e| BotError::Matrix(format!("messages request: {e}")))?;
        let response = error_for_status("messages", response).await?;
        response
            .json()
            .await
            .map_err(|e| BotError::Matrix(format!("decode messages response: {e}")))
    }

    async fn sync_once(&self, since: Option<&str>) -> Result<SyncResponse> {
        let url = format!("{}/_matrix/client/v3/sync", self.base);
        let mut query = vec![
            ("timeout", self.sync_timeout.as_millis().to_string()),
            ("set_presence", "offline".to_string()),
        ];
        if let Some(since) = since {
            query.push(("since", since.to_string()));
        }
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&query)
            .send()
            .await
            .map_err(|e| BotError::Matrix(format!("sync request: {e}")))?;
        let response = error_for_status("sync", response).await?;
        response
            .json()
            .await
            .map_err(|e| BotError::Matrix(format!("decode sync response: {e}")))
    }

    fn collect_messages(&self, response: &SyncResponse) -> Vec<ChannelInboundMessage> {
        let mut messages = Vec::new();
        for (room_id, room) in &response.rooms.join {
            if !self.allowed_rooms.is_empty() && !self.allowed_rooms.contains(room_id) {
                continue;
            }
            for event in &room.timeline.events {
                if event.sender == self.user_id || !is_text_message(event) {
                    continue;
                }
                messages.push(ChannelInboundMessage {
                    channel: "matrix".to_string(),
                    room_id: room_id.clone(),
                    event_id: event.event_id.clone(),
                    sender: event.sender.clone(),
                    body: event.content.body.trim().to_string(),
                    timestamp: millis_to_utc(event.timestamp_ms),
                });
            }
        }
        messages
    }

    fn remember_next_batch(&self, next_batch: String) -> Result<()> {
        self.store.save_next_batch(&self.user_id, &next_batch)?;
        let mut since = self
            .since
            .lock()
            .map_err(|_| BotError::Matrix("sync token lock poisoned".to_string()))?;
        *since = Some(next_batch);
        Ok(())
    }

    fn current_since(&self) -> Result<Option<String>> {
        let since = self
            .since
            .lock()
            .map_err(|_| BotError::Matrix("sync token lock poisoned".to_string()))?;
        Ok(since.clone())
    }

    fn next_txn_id(&self) -> String {
        let counter = self.txn_counter.fetch_add(1, Ordering::Relaxed);
        format!("selkie-{}-{counter}", Utc::now().timestamp_millis())
    }
}

#[async_trait]
impl ChannelAdapter for MatrixAdapter {
    fn id(&self) -> &'static str {
        "matrix"
    }

    async fn send(&self, message: ChannelOutboundMessage) -> anyhow::Result<()> {
        if message.body.trim().is_empty() {
            anyhow::bail!("refusing to send an empty message");
        }
        let mut content = serde_json::json!({
            "msgtype": "m.notice",
            "body": message.body,
        });
        if !message.in_reply_to.is_empty() {
            content["m.relates_to"] = serde_json::json!({
                "rel_type": "m.thread",
                "event_id": message.in_reply_to,
                "is_falling_back": true,
                "m.in_reply_to": { "event_id": message.in_reply_to },
            });
        }
        let url = format!(
            "{}/_matrix/client/v3/rooms/{}/send/m.room.message/{}",
            self.base,
            message.room_id,
            self.next_txn_id(),
        );
        let response = self
            .http
            .put(&url)
            .bearer_auth(&self.token)
            .json(&content)
            .send()
            .await
            .map_err(|e| BotError::Matrix(format!("send request: {e}")))?;
        error_for_status("send", response).await?;
        Ok(())
    }

    async fn run(
        &self,
        inbound_tx: mpsc::Sender<ChannelInboundMessage>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }
            let since = self.current_since()?;
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                result = self.sync_once(since.as_deref()) => result?,
            };
            let messages = self.collect_messages(&response);
            if !messages.is_empty() {
                debug!(count = messages.len(), "received room messages");
            }
            for message in messages {
                if inbound_tx.send(message).await.is_err() {
                    return Ok(());
                }
            }
            self.remember_next_batch(response.next_batch)?;
        }
    }

    async fn health_check(&self) -> anyhow::Result<bool> {
        let user_id = self.whoami().await?;
        Ok(user_id == self.user_id)
    }
}

fn is_text_message(event: &RoomEvent) -> bool {
    event.kind == "m.room.message"
        && event.content.msgtype == "m.text"
        && !event.content.body.trim().is_empty()
}

fn millis_to_utc(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}

async fn error_for_status(context: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(BotError::Matrix(format!(
        "{context} failed with status {status}: {}",
        body.trim()
    )))
}
