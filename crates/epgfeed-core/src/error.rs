//! Pipeline error taxonomy.
//!
//! Every stage returns these explicitly; the controller short-circuits on
//! the first error, releases the lease, and the caller surfaces a
//! human-readable message. Nothing here is retried.

use epgfeed_api::UpstreamError;
use thiserror::Error;

/// Errors that abort a regeneration run.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Upstream fetch or session bootstrap failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Upstream JSON decoded but lacks the expected structure.
    #[error("invalid upstream response shape: {0}")]
    InvalidResponseShape(String),

    /// XMLTV serialization failed.
    #[error("failed to encode feed: {0}")]
    Encode(String),

    /// Filesystem operation on the artifact or lease failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Pipeline result alias.
pub type Result<T> = std::result::Result<T, FeedError>;
