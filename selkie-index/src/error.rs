//! Error types for the selkie-index client.
//!
//! The taxonomy mirrors how each failure is handled: cancellation is
//! propagated verbatim, transport faults and server errors are retried,
//! protocol mismatches stop an operation immediately, and configuration
//! problems are caught before any network traffic happens.

/// Errors returned by [`IndexClient`](crate::IndexClient) operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid client configuration, detected at construction time.
    #[error("config error: {0}")]
    Config(String),

    /// A connect, write, or read failed at the transport level.
    #[error("transport error: {0}")]
    Transport(String),

    /// A single network operation outlived its effective deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The backend answered with a status the protocol does not allow.
    /// Carries up to 4 KiB of the response body for diagnostics.
    #[error("unexpected response status {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend payload could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// The backend closed the query stream normally without answering.
    #[error("search connection closed by server")]
    Closed,

    /// The retry budget ran out. `attempts` counts every send made,
    /// `source` is the failure of the last one.
    #[error("failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: Box<IndexError>,
    },
}

impl IndexError {
    /// Whether retrying the operation could plausibly change the outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}

/// Result alias for index client operations.
pub type Result<T> = std::result::Result<T, IndexError>;
