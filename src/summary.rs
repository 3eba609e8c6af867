//! Conversation summarisation.
//!
//! Recent room messages are grouped into buckets of temporally close
//! activity, each bucket is rendered as a plain transcript, and a topic
//! source turns each transcript into topic bullets.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Messages further apart than this start a new bucket.
const BUCKET_GAP_SECS: i64 = 3600;
/// A bucket never holds more messages than this.
const BUCKET_MAX_MESSAGES: usize = 30;

/// A text message pulled from room history.
#[derive(Debug, Clone)]
pub struct RoomMessage {
    pub sender: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

/// Turns a plain transcript into topic bullets.
#[async_trait]
pub trait TopicSource: Send + Sync {
    async fn topics(&self, transcript: &str) -> Result<String>;
}

/// Summarise `messages` as newline-joined topic bullets, one topic-source
/// call per bucket. Returns an empty string when there is nothing to say.
pub async fn summarise(source: &dyn TopicSource, messages: Vec<RoomMessage>) -> Result<String> {
    let mut parts = Vec::new();
    for bucket in bucket_by_proximity(messages) {
        let transcript = format_transcript(&bucket);
        if transcript.is_empty() {
            continue;
        }
        let topics = source.topics(&transcript).await?;
        let topics = topics.trim();
        if !topics.is_empty() {
            parts.push(topics.to_string());
        }
    }
    Ok(parts.join("\n"))
}

/// Sort by timestamp and split wherever the gap exceeds an hour or a
/// bucket fills up. The sort is stable, so messages sharing a timestamp
/// keep their arrival order.
fn bucket_by_proximity(mut messages: Vec<RoomMessage>) -> Vec<Vec<RoomMessage>> {
    messages.sort_by_key(|m| m.timestamp);

    let mut buckets: Vec<Vec<RoomMessage>> = Vec::new();
    for message in messages {
        let start_new = match buckets.last().and_then(|bucket| bucket.last()) {
            Some(prev) => {
                let gap = (message.timestamp - prev.timestamp).num_seconds();
                gap > BUCKET_GAP_SECS
            }
            None => true,
        };
        let full = buckets
            .last()
            .is_some_and(|bucket| bucket.len() >= BUCKET_MAX_MESSAGES);
        if start_new || full {
            buckets.push(Vec::new());
        }
        if let Some(bucket) = buckets.last_mut() {
            bucket.push(message);
        }
    }
    buckets
}

/// Render a bucket as `sender: body` lines. Messages with a blank sender
/// or body are dropped.
fn format_transcript(messages: &[RoomMessage]) -> String {
    let mut lines = Vec::new();
    for message in messages {
        let sender = message.sender.trim();
        let body = message.body.trim();
        if sender.is_empty() || body.is_empty() {
            continue;
        }
        lines.push(format!("{sender}: {body}"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn msg(sender: &str, body: &str, secs: i64) -> RoomMessage {
        RoomMessage {
            sender: sender.to_string(),
            body: body.to_string(),
            timestamp: at(secs),
        }
    }

    struct RecordingSource {
        transcripts: Mutex<Vec<String>>,
        reply: String,
    }

    #[async_trait]
    impl TopicSource for RecordingSource {
        async fn topics(&self, transcript: &str) -> Result<String> {
            self.transcripts
                .lock()
                .unwrap()
                .push(transcript.to_string());
            Ok(self.reply.clone())
        }
    }

    #[test]
    fn splits_on_hour_gap() {
        let buckets = bucket_by_proximity(vec![
            msg("alice", "a", 0),
            msg("bob", "b", 60),
            msg("alice", "c", 60 + BUCKET_GAP_SECS + 1),
        ]);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].len(), 2);
        assert_eq!(buckets[1].len(), 1);
    }

    #[test]
    fn exact_hour_gap_stays_together() {
        let buckets = bucket_by_proximity(vec![msg("a", "x", 0), msg("b", "y", BUCKET_GAP_SECS)]);
        assert_eq!(buckets.len(), 1);
    }

    #[test]
    fn caps_bucket_size() {
        let messages: Vec<_> = (0..BUCKET_MAX_MESSAGES as i64 + 5)
            .map(|i| msg("alice", "hi", i))
            .collect();
        let buckets = bucket_by_proximity(messages);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].len(), BUCKET_MAX_MESSAGES);
        assert_eq!(buckets[1].len(), 5);
    }

    #[test]
    fn sorts_out_of_order_messages() {
        let buckets = bucket_by_proximity(vec![msg("b", "second", 10), msg("a", "first", 0)]);
        assert_eq!(buckets[0][0].body, "first");
        assert_eq!(buckets[0][1].body, "second");
    }

    #[test]
    fn transcript_skips_blank_lines() {
        let transcript = format_transcript(&[
            msg("alice", "hello", 0),
            msg("", "orphan", 1),
            msg("bob", "   ", 2),
            msg("bob", "world", 3),
        ]);
        assert_eq!(transcript, "alice: hello\nbob: world");
    }

    #[tokio::test]
    async fn summarise_calls_source_per_bucket() {
        let source = RecordingSource {
            transcripts: Mutex::new(Vec::new()),
            reply: "- a topic".to_string(),
        };
        let summary = summarise(
            &source,
            vec![
                msg("alice", "early", 0),
                msg("bob", "late", 2 * BUCKET_GAP_SECS),
            ],
        )
        .await
        .unwrap();

        assert_eq!(summary, "- a topic\n- a topic");
        let transcripts = source.transcripts.lock().unwrap();
        assert_eq!(transcripts.len(), 2);
        assert_eq!(transcripts[0], "alice: early");
        assert_eq!(transcripts[1], "bob: late");
    }

    #[tokio::test]
    async fn summarise_empty_input_is_empty() {
        let source = RecordingSource {
            transcripts: Mutex::new(Vec::new()),
            reply: "- noise".to_string(),
        };
        let summary = summarise(&source, Vec::new()).await.unwrap();
        assert!(summary.is_empty());
        assert!(source.transcripts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_topic_replies_are_dropped() {
        let source = RecordingSource {
            transcripts: Mutex::new(Vec::new()),
            reply: "  ".to_string(),
        };
        let summary = summarise(&source, vec![msg("alice", "hi", 0)])
            .await
            .unwrap();
        assert!(summary.is_empty());
    }
}
