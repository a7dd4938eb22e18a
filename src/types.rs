//! Crate-wide error type.
//!
//! Variants fall into three classes with different propagation rules:
//!
//! * transient network failures ([`FatwaError::Http`], [`FatwaError::Status`])
//!   — retried with backoff inside the crawl client; safe to re-run later
//!   because the corpus store deduplicates identifiers;
//! * structural failures ([`FatwaError::ContentRegion`],
//!   [`FatwaError::Anchor`]) — the page loaded but does not have the expected
//!   shape; captured into the record's `error` field and never retried
//!   automatically;
//! * configuration failures ([`FatwaError::Dimension`],
//!   [`FatwaError::LengthMismatch`], [`FatwaError::Config`]) — fatal, abort
//!   the stage instead of being coerced.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FatwaError {
    /// Transport-level failure: connect, timeout, body read.
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("unexpected http status {status} for {url}")]
    Status { status: u16, url: String },

    /// The page loaded but the designated content container is missing.
    #[error("content region `{selector}` not found in page")]
    ContentRegion { selector: &'static str },

    /// A required anchor never matched the page text.
    #[error("anchor `{0}` not found")]
    Anchor(&'static str),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("embedding provider error: {0}")]
    Embedding(String),

    /// Embedding dimension disagreement between provider and batch output.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    /// Vector/document count disagreement when assembling the bundle.
    #[error("vector matrix holds {vectors} rows but {documents} documents were supplied")]
    LengthMismatch { vectors: usize, documents: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Another run already holds the corpus-directory lock.
    #[error("corpus directory locked: {0}")]
    Lock(String),
}

impl FatwaError {
    /// `true` for failures worth another attempt at the network boundary.
    pub fn is_transient(&self) -> bool {
        match self {
            FatwaError::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            FatwaError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
