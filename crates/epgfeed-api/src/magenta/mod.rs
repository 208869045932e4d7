//! Magenta TV Austria API client module.
//!
//! Bootstraps a short-lived session from the EPG landing page and performs
//! authenticated GETs against the channel-list and schedule-window endpoints.

mod api;
mod client;
mod session;

#[allow(clippy::module_name_repetitions)]
pub use api::{LocalMagentaApi, MagentaApi};
#[allow(clippy::module_name_repetitions)]
pub use client::{MagentaClient, MagentaClientBuilder};
#[allow(clippy::module_name_repetitions)]
pub use session::{MagentaSession, extract_session};
