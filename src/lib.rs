//! Selkie: a chat-room link-indexing and search bot.
//!
//! The bot watches Matrix rooms, submits every link it sees to a search
//! backend for indexing, and answers search commands with the backend's
//! results. When an LLM endpoint is configured it can also summarise
//! recent room activity into topic bullets.
//!
//! # Architecture
//!
//! Independent pieces connected through small seams:
//! - **Channels**: pluggable adapters behind [`channels::traits::ChannelAdapter`];
//!   the Matrix adapter long-polls `/sync` and persists its position
//! - **Bot**: turns inbound messages into searches, summaries, or
//!   background link submissions
//! - **Index client**: the `selkie-index` crate talks to the search
//!   backend with retries, deadlines, and cancellation
//! - **Extractor**: fetches page title/text for links whose content the
//!   backend cannot reach itself
//! - **Storage**: SQLite state for sync tokens and small key/value needs

pub mod bot;
pub mod channels;
pub mod config;
pub mod error;
pub mod extractor;
pub mod llm;
pub mod storage;
pub mod summary;
pub mod triggers;

pub use bot::Bot;
pub use config::BotConfig;
pub use error::{BotError, Result};
pub use storage::StateStore;
