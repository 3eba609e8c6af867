//! Runtime configuration for the bot, loaded from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};

/// Top-level configuration for the bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Matrix homeserver connection settings.
    pub matrix: MatrixConfig,
    /// Message handling behaviour.
    pub bot: BotBehaviourConfig,
    /// Indexing/search backend settings.
    pub index: IndexBackendConfig,
    /// Optional LLM used for room summaries. Summaries are disabled when
    /// absent.
    pub llm: Option<LlmConfig>,
    /// Persistent state storage settings.
    pub storage: StorageConfig,
}

/// Matrix homeserver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    /// Homeserver base URL (http or https).
    pub homeserver_url: String,
    /// Fully-qualified bot user ID (`@bot:example.org`).
    pub user_id: String,
    /// Access token for the bot account.
    pub access_token: String,
    /// Device ID, if the token is bound to one.
    pub device_id: Option<String>,
    /// Display name the bot answers to when mentioned.
    pub bot_display_name: String,
    /// Long-poll timeout for `/sync`, in milliseconds.
    pub sync_timeout_ms: u64,
    /// Room IDs the bot will read from and reply to. Everything else is
    /// ignored.
    pub allowed_room_ids: Vec<String>,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            homeserver_url: String::new(),
            user_id: String::new(),
            access_token: String::new(),
            device_id: None,
            bot_display_name: String::new(),
            sync_timeout_ms: 30_000,
            allowed_room_ids: Vec::new(),
        }
    }
}

impl MatrixConfig {
    /// The `/sync` long-poll timeout.
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }
}

/// Message handling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotBehaviourConfig {
    /// Command that triggers a search (`/search rust async`).
    pub search_command: String,
    /// Maximum number of results included in a reply.
    pub max_results: usize,
    /// Reply mode; only `thread` is supported.
    pub reply_mode: String,
    /// Queries longer than this are truncated before searching.
    pub max_query_len: usize,
}

impl Default for BotBehaviourConfig {
    fn default() -> Self {
        Self {
            search_command: "/search".to_string(),
            max_results: 5,
            reply_mode: "thread".to_string(),
            max_query_len: 200,
        }
    }
}

/// Indexing/search backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexBackendConfig {
    /// Base URL of the backend.
    pub base_url: String,
    /// Path of the ingestion endpoint.
    pub add_path: String,
    /// Path of the websocket query endpoint.
    pub search_path: String,
    /// Per-operation timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Delay before the first retry, in milliseconds.
    pub retry_initial_delay_ms: u64,
    /// Upper bound on the retry delay, in milliseconds.
    pub retry_max_delay_ms: u64,
    /// Number of retries after the initial attempt.
    pub retry_max_attempts: u32,
}

impl Default for IndexBackendConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            add_path: "/add".to_string(),
            search_path: "/search".to_string(),
            request_timeout_ms: 10_000,
            retry_initial_delay_ms: 100,
            retry_max_delay_ms: 1_000,
            retry_max_attempts: 3,
        }
    }
}

/// OpenAI-compatible LLM endpoint used for room summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Chat-completions base URL (`https://host/v1`).
    pub api_url: String,
    /// Bearer token; may be empty for local servers.
    #[serde(default)]
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

/// Persistent storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database holding bot state and sync tokens. Relative paths
    /// resolve against the config file's directory.
    pub state_db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_db_path: PathBuf::from("selkie-state.db"),
        }
    }
}

impl BotConfig {
    /// Load, default-fill, resolve, and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BotError::Config(format!("read {}: {e}", path.display())))?;
        let mut config: BotConfig = toml::from_str(&raw)
            .map_err(|e| BotError::Config(format!("parse {}: {e}", path.display())))?;
        if let Some(base) = path.parent() {
            config.storage.state_db_path = resolve_path(base, &config.storage.state_db_path);
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration, collecting every issue into one error.
    pub fn validate(&self) -> Result<()> {
        let mut issues = Vec::new();

        if let Err(issue) = validate_http_url(&self.matrix.homeserver_url) {
            issues.push(format!("matrix.homeserver_url {issue}"));
        }
        if self.matrix.user_id.trim().is_empty() {
            issues.push("matrix.user_id is required".to_string());
        }
        if self.matrix.access_token.trim().is_empty() {
            issues.push("matrix.access_token is required".to_string());
        }
        if self.matrix.bot_display_name.trim().is_empty() {
            issues.push("matrix.bot_display_name is required".to_string());
        }
        if self.matrix.sync_timeout_ms == 0 {
            issues.push("matrix.sync_timeout_ms must be > 0".to_string());
        }
        if self.matrix.allowed_room_ids.is_empty() {
            issues.push("matrix.allowed_room_ids must include at least one room".to_string());
        }
        for (i, room) in self.matrix.allowed_room_ids.iter().enumerate() {
            let room = room.trim();
            if room.is_empty() {
                issues.push(format!("matrix.allowed_room_ids[{i}] is empty"));
            } else if !room.starts_with('!') {
                issues.push(format!("matrix.allowed_room_ids[{i}] must start with '!'"));
            }
        }

        if self.bot.search_command.trim().is_empty() {
            issues.push("bot.search_command is required".to_string());
        }
        if self.bot.max_results == 0 {
            issues.push("bot.max_results must be > 0".to_string());
        }
        if self.bot.reply_mode != "thread" {
            issues.push("bot.reply_mode must be 'thread'".to_string());
        }
        if self.bot.max_query_len == 0 {
            issues.push("bot.max_query_len must be > 0".to_string());
        }

        if let Err(err) = self.index_client_config().validate() {
            issues.push(format!("index: {err}"));
        }

        if let Some(llm) = &self.llm {
            if let Err(issue) = validate_http_url(&llm.api_url) {
                issues.push(format!("llm.api_url {issue}"));
            }
            if llm.model.trim().is_empty() {
                issues.push("llm.model is required".to_string());
            }
        }

        if self.storage.state_db_path.as_os_str().is_empty() {
            issues.push("storage.state_db_path is required".to_string());
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(BotError::Config(format!(
                "invalid config: {}",
                issues.join("; ")
            )))
        }
    }

    /// The backend client configuration derived from the `[index]` section.
    pub fn index_client_config(&self) -> selkie_index::IndexConfig {
        selkie_index::IndexConfig {
            base_url: self.index.base_url.clone(),
            add_path: self.index.add_path.clone(),
            search_path: self.index.search_path.clone(),
            timeout: Duration::from_millis(self.index.request_timeout_ms),
            retry: selkie_index::RetryPolicy {
                initial_delay: Duration::from_millis(self.index.retry_initial_delay_ms),
                max_delay: Duration::from_millis(self.index.retry_max_delay_ms),
                max_attempts: self.index.retry_max_attempts,
            },
        }
    }
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.as_os_str().is_empty() || path.is_absolute() {
        return path.to_path_buf();
    }
    base.join(path)
}

fn validate_http_url(raw: &str) -> std::result::Result<(), String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("is required".to_string());
    }
    let parsed = url::Url::parse(raw).map_err(|e| format!("must be a valid URL: {e}"))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err("must use http or https".to_string());
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err("must include a host".to_string());
    }
    Ok(())
}
