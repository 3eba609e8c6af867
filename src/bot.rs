//! Message handling.
//!
//! Three things can happen to an inbound room message: a search trigger
//! produces a results reply, the summary command produces a topic summary
//! of recent room history, and anything else has its URLs submitted to
//! the index in the background. Only triggers ever get a reply.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use selkie_index::{IndexClient, SearchResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::channels::MessageHandler;
use crate::channels::matrix::MatrixAdapter;
use crate::channels::traits::{ChannelInboundMessage, ChannelOutboundMessage};
use crate::config::BotConfig;
use crate::error::Result;
use crate::summary::{self, TopicSource};
use crate::triggers::TriggerParser;

const SUMMARY_COMMAND: &str = "/summary";
/// How far back a summary looks.
const SUMMARY_WINDOW_HOURS: i64 = 24;
/// Upper bound on the history fetched for one summary.
const SUMMARY_MAX_MESSAGES: usize = 200;

const NO_RESULTS_REPLY: &str = "No results found.";
const SEARCH_FAILED_REPLY: &str = "Search failed. Please try again later.";
const NOTHING_TO_SUMMARISE_REPLY: &str = "Nothing to summarise yet.";
const SUMMARY_FAILED_REPLY: &str = "Summary failed. Please try again later.";

pub struct Bot {
    triggers: TriggerParser,
    index: Arc<IndexClient>,
    matrix: Arc<MatrixAdapter>,
    topics: Option<Arc<dyn TopicSource>>,
    max_results: usize,
    max_query_len: usize,
    cancel: CancellationToken,
}

impl Bot {
    pub fn new(
        config: &BotConfig,
        index: Arc<IndexClient>,
        matrix: Arc<MatrixAdapter>,
        topics: Option<Arc<dyn TopicSource>>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let triggers = TriggerParser::new(
            &config.bot.search_command,
            &config.matrix.bot_display_name,
        )?;
        Ok(Self {
            triggers,
            index,
            matrix,
            topics,
            max_results: config.bot.max_results,
            max_query_len: config.bot.max_query_len,
            cancel,
        })
    }

    async fn handle_search(&self, query: &str) -> String {
        let query = truncate_chars(query, self.max_query_len);
        match self
            .index
            .search(&query, self.max_results, &self.cancel, None)
            .await
        {
            Ok(results) if results.is_empty() => NO_RESULTS_REPLY.to_string(),
            Ok(results) => format_results(&results),
            Err(e) => {
                warn!(query = %query, error = %e, "search failed");
                SEARCH_FAILED_REPLY.to_string()
            }
        }
    }

    async fn handle_summary(&self, room_id: &str, topics: &dyn TopicSource) -> String {
        let since = Utc::now() - ChronoDuration::hours(SUMMARY_WINDOW_HOURS);
        let messages = match self
            .matrix
            .recent_messages(room_id, since, SUMMARY_MAX_MESSAGES)
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                warn!(room = %room_id, error = %e, "failed to fetch room history");
                return SUMMARY_FAILED_REPLY.to_string();
            }
        };
        if messages.is_empty() {
            return NOTHING_TO_SUMMARISE_REPLY.to_string();
        }
        match summary::summarise(topics, messages).await {
            Ok(summary) if summary.is_empty() => NOTHING_TO_SUMMARISE_REPLY.to_string(),
            Ok(summary) => summary,
            Err(e) => {
                warn!(room = %room_id, error = %e, "summarisation failed");
                SUMMARY_FAILED_REPLY.to_string()
            }
        }
    }

    /// Submit every URL in `body` for indexing without blocking the
    /// dispatch loop. Failures are logged, never replied to.
    fn submit_urls(&self, body: &str) {
        for url in self.triggers.extract_urls(body) {
            let index = Arc::clone(&self.index);
            let cancel = self.cancel.child_token();
            tokio::spawn(async move {
                match index.submit_url(&url, &cancel, None).await {
                    Ok(()) => debug!(url = %url, "URL submitted for indexing"),
                    Err(e) => warn!(url = %url, error = %e, "failed to submit URL"),
                }
            });
        }
    }
}

#[async_trait]
impl MessageHandler for Bot {
    async fn handle(
        &self,
        message: &ChannelInboundMessage,
    ) -> anyhow::Result<Option<ChannelOutboundMessage>> {
        let reply = |body: String| {
            Some(ChannelOutboundMessage {
                room_id: message.room_id.clone(),
                in_reply_to: message.event_id.clone(),
                body,
            })
        };

        if let Some(query) = self.triggers.extract_search_query(&message.body) {
            return Ok(reply(self.handle_search(&query).await));
        }

        if message.body.trim() == SUMMARY_COMMAND {
            if let Some(topics) = &self.topics {
                return Ok(reply(self.handle_summary(&message.room_id, topics.as_ref()).await));
            }
            debug!(room = %message.room_id, "summary requested but no LLM configured");
            return Ok(None);
        }

        self.submit_urls(&message.body);
        Ok(None)
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    if max == 0 {
        return text.trim().to_string();
    }
    text.trim().chars().take(max).collect()
}

fn format_results(results: &[SearchResult]) -> String {
    let mut entries = Vec::new();
    for (position, result) in results.iter().enumerate() {
        let title = if result.title.trim().is_empty() {
            result.url.as_str()
        } else {
            result.title.trim()
        };
        let mut entry = format!("{}. {title}\n{}", position + 1, result.url);
        let snippet = result.snippet.trim();
        if !snippet.is_empty() {
            entry.push('\n');
            entry.push_str(snippet);
        }
        entries.push(entry);
    }
    entries.join("\n\n")
}
