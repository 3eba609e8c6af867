//! Client configuration with eager validation.

use std::time::Duration;

use crate::endpoint::{self, Transport};
use crate::error::IndexError;
use crate::retry::RetryPolicy;

/// Configuration for an [`IndexClient`](crate::IndexClient).
///
/// Immutable for the lifetime of the client and validated once at
/// construction, never inside a retry loop.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Base address of the backend. Accepts http, https, ws, or wss; the
    /// scheme is translated per transport when endpoints are resolved.
    pub base_url: String,
    /// Path of the ingestion endpoint, relative to the base.
    pub add_path: String,
    /// Path of the streaming query endpoint, relative to the base.
    pub search_path: String,
    /// Timeout applied to each individual network operation: a connect,
    /// a single write, or a single read.
    pub timeout: Duration,
    /// Backoff policy shared by ingestion and search.
    pub retry: RetryPolicy,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            add_path: "/add".to_string(),
            search_path: "/search".to_string(),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

impl IndexConfig {
    /// Check the configuration for problems that would otherwise only
    /// surface mid-operation.
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.base_url.trim().is_empty() {
            return Err(IndexError::Config("base_url is required".into()));
        }
        endpoint::resolve(&self.base_url, "/", Transport::Http)?;
        for (name, path) in [("add_path", &self.add_path), ("search_path", &self.search_path)] {
            if !path.trim().starts_with('/') {
                return Err(IndexError::Config(format!("{name} must start with '/'")));
            }
        }
        if self.timeout.is_zero() {
            return Err(IndexError::Config("timeout must be greater than zero".into()));
        }
        Ok(())
    }
}
