//! Selkie bot entry point.
//!
//! Usage: `selkie <config.toml>`

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use selkie::channels::matrix::MatrixAdapter;
use selkie::channels::run_channels;
use selkie::channels::traits::ChannelAdapter;
use selkie::extractor::PageExtractor;
use selkie::llm::TopicExtractor;
use selkie::summary::TopicSource;
use selkie::{Bot, BotConfig, StateStore};

/// Topic extraction can take a while on small local models.
const LLM_TIMEOUT: Duration = Duration::from_secs(120);
/// Page fetches for fallback content.
const EXTRACTOR_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: selkie <config.toml>")?;
    let config = BotConfig::load(&config_path)
        .with_context(|| format!("load config from {}", config_path.display()))?;

    let store = Arc::new(StateStore::open(&config.storage.state_db_path)?);
    let matrix = Arc::new(MatrixAdapter::new(&config.matrix, Arc::clone(&store))?);

    let extractor = Arc::new(PageExtractor::new(EXTRACTOR_TIMEOUT)?);
    let index = Arc::new(
        selkie_index::IndexClient::new(config.index_client_config())?
            .with_content_source(extractor),
    );

    let topics: Option<Arc<dyn TopicSource>> = match &config.llm {
        Some(llm) => Some(Arc::new(TopicExtractor::new(llm, LLM_TIMEOUT)?)),
        None => {
            info!("no [llm] section configured; summaries disabled");
            None
        }
    };

    match matrix.whoami().await {
        Ok(user_id) if user_id == config.matrix.user_id => {
            info!(user = %user_id, "authenticated with homeserver");
        }
        Ok(user_id) => {
            warn!(
                expected = %config.matrix.user_id,
                actual = %user_id,
                "access token belongs to a different user"
            );
        }
        Err(e) => {
            warn!(error = %e, "homeserver health check failed; continuing anyway");
        }
    }

    let cancel = CancellationToken::new();
    let bot = Arc::new(Bot::new(
        &config,
        Arc::clone(&index),
        Arc::clone(&matrix),
        topics,
        cancel.clone(),
    )?);

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
                cancel.cancel();
            }
        });
    }

    info!(homeserver = %config.matrix.homeserver_url, "selkie starting");
    run_channels(vec![matrix as Arc<dyn ChannelAdapter>], bot, cancel).await
}
