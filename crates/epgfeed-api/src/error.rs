//! Error types for upstream requests.

use thiserror::Error;

/// Failure modes of the upstream provider interface.
///
/// None of these are retried; a single failed attempt aborts the caller's
/// regeneration run.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The landing page did not contain the expected embedded configuration
    /// block (`window.APP_CONSTANTS = {...}`).
    #[error("could not extract app configuration from landing page: {0}")]
    ConfigExtraction(String),

    /// Transport-level request failure (connect, TLS, timeout, read).
    #[error("upstream request failed: {url}")]
    Request {
        /// Request URL.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The upstream responded with an empty body.
    #[error("upstream returned an empty response: {url}")]
    EmptyBody {
        /// Request URL.
        url: String,
    },
}
