//! `MagentaApi` trait definition.
#![allow(clippy::future_not_send)]

use chrono::NaiveDate;

use super::session::MagentaSession;
use crate::error::UpstreamError;

/// Magenta upstream API trait.
///
/// Abstracts the provider endpoints for mock substitution in tests.
/// Uses `trait_variant::make` to generate a `Send`-bound async trait; the
/// regeneration controller runs inside the HTTP server and needs `Send`
/// futures, so implementors target the `MagentaApi` variant.
#[allow(clippy::module_name_repetitions)]
#[trait_variant::make(MagentaApi: Send)]
pub trait LocalMagentaApi {
    /// Bootstraps a session context from the provider landing page.
    ///
    /// # Errors
    ///
    /// Returns an error if the page fetch fails or the embedded
    /// configuration block cannot be extracted.
    async fn bootstrap_session(&self) -> Result<MagentaSession, UpstreamError>;

    /// Fetches the raw channel-list payload.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an empty response body.
    async fn fetch_channel_list(&self, session: &MagentaSession)
    -> Result<String, UpstreamError>;

    /// Fetches one raw 3-hour schedule window for one station on one day.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an empty response body.
    async fn fetch_schedule_window(
        &self,
        session: &MagentaSession,
        station_id: &str,
        date: NaiveDate,
        hour_offset: u8,
    ) -> Result<String, UpstreamError>;
}
