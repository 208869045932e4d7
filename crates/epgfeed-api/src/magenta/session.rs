//! Ephemeral session bootstrap from the Magenta landing page.
//!
//! The web player embeds its app configuration as a script-level global
//! (`window.APP_CONSTANTS = {...}`). The scrape lives behind this narrow
//! function so the extraction technique can change without touching the
//! rest of the client.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::UpstreamError;

/// Regex for the embedded configuration assignment.
#[allow(clippy::expect_used)]
static APP_CONSTANTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"window\.APP_CONSTANTS = (\{".*"\})"#)
        .expect("failed to compile APP_CONSTANTS regex")
});

/// Session context extracted once per regeneration run.
///
/// Lives for a single run and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagentaSession {
    /// `app_key` request header value.
    pub app_key: String,
    /// `app_version` request header value.
    pub app_version: String,
    /// `Device-Id` request header value.
    pub device_id: String,
}

/// Embedded configuration keys we care about. Missing keys default to empty
/// strings, matching the web player's own tolerance.
#[derive(Debug, Deserialize)]
struct AppConstants {
    #[serde(rename = "CMS_CONFIGURATION_API_KEY", default)]
    api_key: String,
    #[serde(rename = "APP_VERSION", default)]
    app_version: String,
    #[serde(rename = "DEVICE_ID", default)]
    device_id: String,
}

/// Extracts the session context from the landing page HTML.
///
/// # Errors
///
/// Returns [`UpstreamError::ConfigExtraction`] if the configuration block is
/// absent or is not valid JSON.
pub fn extract_session(html: &str) -> Result<MagentaSession, UpstreamError> {
    let captures = APP_CONSTANTS_RE.captures(html).ok_or_else(|| {
        UpstreamError::ConfigExtraction(String::from(
            "window.APP_CONSTANTS assignment not found in page",
        ))
    })?;

    let raw = captures
        .get(1)
        .ok_or_else(|| {
            UpstreamError::ConfigExtraction(String::from("configuration capture group missing"))
        })?
        .as_str();

    let constants: AppConstants = serde_json::from_str(raw)
        .map_err(|e| UpstreamError::ConfigExtraction(format!("invalid configuration JSON: {e}")))?;

    Ok(MagentaSession {
        app_key: constants.api_key,
        app_version: constants.app_version,
        device_id: constants.device_id,
    })
}
