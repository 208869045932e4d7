//! Upstream API client library for epgfeed.
//!
//! Provides the Magenta TV Austria client: landing-page session bootstrap,
//! channel list, and 3-hour schedule window fetches.

/// Upstream error taxonomy.
pub mod error;

/// Magenta TV Austria API client.
pub mod magenta;

pub use error::UpstreamError;
