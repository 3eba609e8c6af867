//! Error types for the selkie bot shell.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Configuration error (load, parse, or validation).
    #[error("config error: {0}")]
    Config(String),

    /// Matrix client-server API error.
    #[error("matrix error: {0}")]
    Matrix(String),

    /// Indexing/search backend error.
    #[error("index error: {0}")]
    Index(#[from] selkie_index::IndexError),

    /// Page fetch or content extraction error.
    #[error("extractor error: {0}")]
    Extractor(String),

    /// State storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// LLM summarisation error.
    #[error("llm error: {0}")]
    Llm(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, BotError>;
