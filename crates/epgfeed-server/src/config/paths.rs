//! Config directory resolution.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Resolves the config file path.
///
/// - If `dir` is `Some`, returns `{dir}/config.toml`.
/// - Otherwise returns `~/.config/epgfeed/config.toml`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined (when `dir` is `None`).
pub fn resolve_config_path(dir: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(d) = dir {
        return Ok(d.join("config.toml"));
    }

    let home = std::env::var("HOME").context("HOME environment variable is not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("epgfeed")
        .join("config.toml"))
}
