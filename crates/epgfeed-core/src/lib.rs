//! EPG regeneration pipeline for epgfeed.
//!
//! Turns raw Magenta channel/schedule JSON into a canonical schedule
//! document, encodes it as gzipped XMLTV, and orchestrates staleness-driven,
//! single-flight regeneration over a TTL'd response cache.

/// Upstream JSON to canonical model transform.
pub mod builder;
/// TTL'd response cache over raw upstream payloads.
pub mod cache;
/// Pipeline error taxonomy.
pub mod error;
/// Single-flight regeneration lease.
pub mod lock;
/// Canonical schedule document model.
pub mod model;
/// Regeneration controller.
pub mod regen;
/// Channel-id remapping to the A1 numbering scheme.
pub mod remap;
/// XMLTV encoding and gzip packaging.
pub mod xmltv;

pub use error::FeedError;
pub use model::{Channel, LocalizedText, Programme, ScheduleDocument};
pub use regen::{RegenerationController, RegenerationOptions, RunOutcome};
