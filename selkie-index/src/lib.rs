//! # selkie-index
//!
//! Client for selkie's remote indexing/search backend.
//!
//! The backend is reached over two transports sharing one base URL:
//! document ingestion is a request/response HTTP call, and querying is a
//! single write/read exchange on a websocket dialled per call. Both
//! operations retry transient failures under one policy, bound every
//! network step by a deadline composed from the configured timeout and
//! the caller's own deadline, and abort promptly when the caller's
//! cancellation token fires.
//!
//! ## Behaviour
//!
//! - Transport faults, per-operation timeouts, server errors, and
//!   abnormal stream closes are retried with capped exponential backoff
//! - Protocol mismatches (an unexpected status, an undecodable payload,
//!   a normal close before the reply) surface immediately, since
//!   retrying cannot fix them
//! - No connection outlives the call that opened it
//! - The client logs nothing; every failure is fully described by the
//!   [`IndexError`] it returns

pub mod client;
pub mod config;
pub mod deadline;
pub mod endpoint;
pub mod error;
pub mod response;
pub mod retry;

pub use client::{ContentSource, IndexClient};
pub use config::IndexConfig;
pub use endpoint::Transport;
pub use error::{IndexError, Result};
pub use response::SearchResult;
pub use retry::RetryPolicy;
